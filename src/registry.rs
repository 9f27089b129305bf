//! Option registry — RFC 8415 describes an open-ended option space;
//! §4.2 of the core design asks for a process-wide table mapping option
//! codes to their multiplicity (how many times the code may legally
//! appear in one container) and a display name, frozen before the
//! listener starts.
//!
//! The wire-format dispatch itself (`DhcpOption::decode`/`encode`) is a
//! closed match over [`crate::options::OptionCode`] — extending it to a
//! new option means adding an enum variant, not registering a decoder
//! function, since every decoder in this crate needs to be known at
//! compile time anyway (no dynamic loading). What *is* genuinely dynamic,
//! and therefore what this registry tracks, is the multiplicity/name
//! metadata that the pipeline and configuration loader consult — e.g. to
//! decide whether a handler's second write to a code replaces or appends
//! (§4.5), and to validate that extensions configured together don't
//! collide on a code (§4.2 "duplicate registration is a fatal
//! configuration error").

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::options::OptionCode;

/// how many times an option may legally appear within one container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// at most one instance per container (a second `handle`-phase write
    /// replaces the first, per §4.5)
    AtMostOne,
    /// any number of instances per container (writes append)
    Many,
}

/// registry metadata for one option code
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// display name, used in logs and the `stats` control command
    pub name: &'static str,
    /// multiplicity constraint enforced by the pipeline, not the codec
    pub multiplicity: Multiplicity,
}

/// A mutable registry under construction. Extensions register their
/// option codes during startup; [`OptionRegistry::freeze`] consumes it
/// into an immutable table the pipeline can share lock-free across
/// workers.
#[derive(Debug, Default)]
pub struct OptionRegistryBuilder {
    entries: HashMap<OptionCode, RegistryEntry>,
}

impl OptionRegistryBuilder {
    /// start with nothing registered
    pub fn new() -> Self {
        Self::default()
    }

    /// seed the builder with every option this crate implements natively,
    /// using their RFC-correct multiplicity
    pub fn with_builtin_options() -> Self {
        let mut b = Self::new();
        use Multiplicity::*;
        use OptionCode::*;
        let builtins: &[(OptionCode, &'static str, Multiplicity)] = &[
            (ClientId, "client-id", AtMostOne),
            (ServerId, "server-id", AtMostOne),
            (IaNa, "ia-na", Many),
            (IaTa, "ia-ta", Many),
            (IaAddr, "ia-addr", Many),
            (Oro, "option-request", AtMostOne),
            (Preference, "preference", AtMostOne),
            (ElapsedTime, "elapsed-time", AtMostOne),
            (RelayMsg, "relay-message", AtMostOne),
            (Auth, "authentication", AtMostOne),
            (ServerUnicast, "server-unicast", AtMostOne),
            (StatusCode, "status-code", AtMostOne),
            (RapidCommit, "rapid-commit", AtMostOne),
            (UserClass, "user-class", AtMostOne),
            (VendorClass, "vendor-class", Many),
            (VendorOpts, "vendor-opts", Many),
            (InterfaceId, "interface-id", AtMostOne),
            (ReconfMsg, "reconf-msg", AtMostOne),
            (ReconfAccept, "reconf-accept", AtMostOne),
            (SipServerD, "sip-server-dns", AtMostOne),
            (SipServerA, "sip-server-addr", AtMostOne),
            (DnsServers, "dns-servers", AtMostOne),
            (DomainList, "domain-search-list", AtMostOne),
            (IaPd, "ia-pd", Many),
            (IaPrefix, "ia-prefix", Many),
            (SntpServers, "sntp-servers", AtMostOne),
            (InformationRefreshTime, "information-refresh-time", AtMostOne),
            (RemoteId, "remote-id", AtMostOne),
            (SubscriberId, "subscriber-id", AtMostOne),
            (LqQuery, "lq-query", AtMostOne),
            (ClientData, "client-data", Many),
            (CltTime, "clt-time", AtMostOne),
            (LqRelayData, "lq-relay-data", AtMostOne),
            (LqClientLink, "lq-client-link", AtMostOne),
            (RelayId, "relay-id", AtMostOne),
            (NtpServer, "ntp-server", AtMostOne),
            (AftrName, "aftr-name", AtMostOne),
            (ClientLinkLayerAddr, "client-link-layer-addr", AtMostOne),
            (SolMaxRt, "sol-max-rt", AtMostOne),
            (InfMaxRt, "inf-max-rt", AtMostOne),
            (S46Rule, "s46-rule", Many),
            (S46Br, "s46-br", AtMostOne),
            (S46Dmr, "s46-dmr", AtMostOne),
            (S46V4V6Bind, "s46-v4v6bind", Many),
            (S46PortParams, "s46-portparams", AtMostOne),
            (S46ContMape, "s46-cont-mape", AtMostOne),
            (S46ContMapt, "s46-cont-mapt", AtMostOne),
            (S46ContLw, "s46-cont-lw", AtMostOne),
        ];
        for (code, name, mult) in builtins.iter().copied() {
            // builtins never collide with each other; unwrap is safe
            b.register(code, name, mult).expect("builtin option codes are unique");
        }
        b
    }

    /// register `code` with the given name and multiplicity. Fails if
    /// `code` has already been registered, per §4.2 "duplicate
    /// registration is a fatal configuration error".
    pub fn register(
        &mut self,
        code: OptionCode,
        name: &'static str,
        multiplicity: Multiplicity,
    ) -> Result<(), ConfigError> {
        if self.entries.contains_key(&code) {
            return Err(ConfigError::DuplicateRegistration(code.into()));
        }
        self.entries.insert(code, RegistryEntry { name, multiplicity });
        Ok(())
    }

    /// consume the builder into an immutable, shareable registry
    pub fn freeze(self) -> OptionRegistry {
        OptionRegistry {
            entries: self.entries,
        }
    }
}

/// An immutable option registry, safe to share across worker threads
/// without locking (§5 "the Option registry is immutable after
/// startup").
#[derive(Debug, Default, Clone)]
pub struct OptionRegistry {
    entries: HashMap<OptionCode, RegistryEntry>,
}

impl OptionRegistry {
    /// metadata for `code`, if registered
    pub fn get(&self, code: OptionCode) -> Option<&RegistryEntry> {
        self.entries.get(&code)
    }

    /// the multiplicity for `code`, defaulting to `Many` for anything not
    /// explicitly registered (an unregistered/unknown code is treated
    /// conservatively: handlers should append rather than silently
    /// overwrite data they don't understand)
    pub fn multiplicity(&self, code: OptionCode) -> Multiplicity {
        self.entries
            .get(&code)
            .map(|e| e.multiplicity)
            .unwrap_or(Multiplicity::Many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_no_duplicates() {
        let registry = OptionRegistryBuilder::with_builtin_options().freeze();
        assert_eq!(registry.multiplicity(OptionCode::ServerId), Multiplicity::AtMostOne);
        assert_eq!(registry.multiplicity(OptionCode::IaNa), Multiplicity::Many);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut builder = OptionRegistryBuilder::new();
        builder
            .register(OptionCode::ServerId, "server-id", Multiplicity::AtMostOne)
            .unwrap();
        let err = builder
            .register(OptionCode::ServerId, "server-id-again", Multiplicity::Many)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRegistration(2)));
    }
}
