//! Lease/identity store contract — §6: "the core itself persists
//! nothing. Lease stores (external) define their own on-disk layout;
//! the core only requires the contract `allocate`, `renew`, `release`."
//!
//! Handlers that need a binding go through [`LeaseStore`] rather than
//! touching storage directly, so a real backend (a file-backed journal,
//! a SQL table, a remote lease daemon) can be substituted without the
//! pipeline noticing. Every method takes an explicit deadline budget
//! per §4.7 ("handlers that need external I/O must be given explicit
//! bounded budgets and timeouts") — a handler bridges into this async
//! trait from its synchronous `handle` hook via `Handle::block_on`,
//! which is why the bound is expressed as a `Duration` rather than a
//! cooperative cancellation token.

use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::duid::Duid;
use crate::error::StoreError;

/// client-supplied hints narrowing what [`LeaseStore::allocate`] should
/// hand out. `requested_address`/`requested_prefix_len` come from the
/// client's IA-Address/IA-Prefix hints; a store is free to ignore them
/// if the requested value is already taken.
#[derive(Debug, Clone, Default)]
pub struct AllocationHint {
    pub requested_address: Option<Ipv6Addr>,
    pub requested_prefix_len: Option<u8>,
}

/// a granted address or prefix plus its lifetimes, handed back to the
/// handler that requested it and later passed to `renew`/`release`
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub client_id: Duid,
    pub iaid: u32,
    pub address: Ipv6Addr,
    pub prefix_len: Option<u8>,
    pub preferred_life: u32,
    pub valid_life: u32,
}

/// the contract a lease/identity backend must honor.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// grant a new binding for `(client_id, iaid)`, or
    /// `StoreError::PoolExhausted` if nothing is available.
    async fn allocate(
        &self,
        client_id: &Duid,
        iaid: u32,
        hints: AllocationHint,
        deadline: Duration,
    ) -> Result<Lease, StoreError>;

    /// extend the lifetimes of an existing binding.
    async fn renew(&self, lease: &Lease, deadline: Duration) -> Result<Lease, StoreError>;

    /// release a binding; a no-op, not an error, if none exists.
    async fn release(&self, client_id: &Duid, iaid: u32, deadline: Duration) -> Result<(), StoreError>;
}

/// in-memory reference implementation of [`LeaseStore`] — not a
/// production backend (§1 Non-goals: "persistent lease database design
/// beyond the store contract"). Hands out addresses from a fixed pool,
/// first-come-first-served, keyed by `(client_id, iaid)` so repeat
/// requests see the same binding.
pub struct InMemoryLeaseStore {
    pool: Vec<Ipv6Addr>,
    preferred_life: u32,
    valid_life: u32,
    bindings: Mutex<HashMap<(Duid, u32), Ipv6Addr>>,
}

impl InMemoryLeaseStore {
    pub fn new(pool: Vec<Ipv6Addr>, preferred_life: u32, valid_life: u32) -> Self {
        InMemoryLeaseStore {
            pool,
            preferred_life,
            valid_life,
            bindings: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn allocate(
        &self,
        client_id: &Duid,
        iaid: u32,
        hints: AllocationHint,
        deadline: Duration,
    ) -> Result<Lease, StoreError> {
        timeout(deadline, async {
            let mut bindings = self.bindings.lock().await;
            let key = (client_id.clone(), iaid);
            if let Some(addr) = bindings.get(&key) {
                return Ok(lease_for(client_id, iaid, *addr, self.preferred_life, self.valid_life));
            }
            let taken: std::collections::HashSet<_> = bindings.values().copied().collect();
            let preferred = hints
                .requested_address
                .filter(|addr| self.pool.contains(addr) && !taken.contains(addr));
            let addr = preferred
                .or_else(|| self.pool.iter().copied().find(|a| !taken.contains(a)))
                .ok_or(StoreError::PoolExhausted)?;
            bindings.insert(key, addr);
            Ok(lease_for(client_id, iaid, addr, self.preferred_life, self.valid_life))
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    async fn renew(&self, lease: &Lease, deadline: Duration) -> Result<Lease, StoreError> {
        timeout(deadline, async {
            let bindings = self.bindings.lock().await;
            let key = (lease.client_id.clone(), lease.iaid);
            if bindings.contains_key(&key) {
                Ok(lease.clone())
            } else {
                Err(StoreError::NoBinding)
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    async fn release(&self, client_id: &Duid, iaid: u32, deadline: Duration) -> Result<(), StoreError> {
        timeout(deadline, async {
            let mut bindings = self.bindings.lock().await;
            bindings.remove(&(client_id.clone(), iaid));
            Ok(())
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }
}

fn lease_for(client_id: &Duid, iaid: u32, address: Ipv6Addr, preferred_life: u32, valid_life: u32) -> Lease {
    Lease {
        client_id: client_id.clone(),
        iaid,
        address,
        prefix_len: None,
        preferred_life,
        valid_life,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duid() -> Duid {
        Duid::ethernet_ll([1, 2, 3, 4, 5, 6])
    }

    #[tokio::test]
    async fn allocate_is_stable_for_repeat_requests() {
        let store = InMemoryLeaseStore::new(vec!["2001:db8::1".parse().unwrap()], 3600, 7200);
        let first = store
            .allocate(&duid(), 1, AllocationHint::default(), Duration::from_millis(100))
            .await
            .unwrap();
        let second = store
            .allocate(&duid(), 1, AllocationHint::default(), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(first.address, second.address);
    }

    #[tokio::test]
    async fn allocate_fails_when_pool_exhausted() {
        let store = InMemoryLeaseStore::new(vec!["2001:db8::1".parse().unwrap()], 3600, 7200);
        store
            .allocate(&duid(), 1, AllocationHint::default(), Duration::from_millis(100))
            .await
            .unwrap();
        let other = Duid::ethernet_ll([6, 5, 4, 3, 2, 1]);
        let err = store
            .allocate(&other, 1, AllocationHint::default(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PoolExhausted));
    }

    #[tokio::test]
    async fn release_then_reallocate_reuses_the_address() {
        let store = InMemoryLeaseStore::new(vec!["2001:db8::1".parse().unwrap()], 3600, 7200);
        let lease = store
            .allocate(&duid(), 1, AllocationHint::default(), Duration::from_millis(100))
            .await
            .unwrap();
        store.release(&duid(), 1, Duration::from_millis(100)).await.unwrap();
        let other = Duid::ethernet_ll([6, 5, 4, 3, 2, 1]);
        let realloc = store
            .allocate(&other, 1, AllocationHint::default(), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(lease.address, realloc.address);
    }
}
