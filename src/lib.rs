//! `dhcv6d` — a DHCPv6 server core: wire codec, option/extension dispatch,
//! and a filter/handler pipeline driven off a declarative configuration
//! tree.
//!
//! The crate is organized bottom-up:
//!
//! - [`decoder`]/[`encoder`]: the bounded byte-level primitives every
//!   wire-format type is built on.
//! - [`duid`], [`domain`], [`options`], [`message`]: the DHCPv6 wire
//!   format itself — DUIDs, DNS names, options (including the extensions
//!   listed in [`options::OptionCode`]), and the message types that carry
//!   them.
//! - [`registry`]: multiplicity and naming metadata for option codes,
//!   populated at startup and frozen before the pipeline runs.
//! - [`transaction`], [`filter`], [`handler`], [`pipeline`]: the request
//!   pipeline — a per-datagram [`transaction::Transaction`] run through a
//!   filter-scoped, precedence-ordered sequence of
//!   [`handler::Handler`]s.
//! - [`config`]: deserializes a configuration tree into a running
//!   pipeline, registry, and listener set.
//! - [`listener`], [`worker`]: the async I/O and concurrency layer —
//!   socket(s) in, a bounded worker pool, socket(s) out.
//! - [`stats`]: Prometheus counters/histograms and the control-socket
//!   text protocol.
//! - [`store`]: the trait boundary to a lease/identity backend, plus an
//!   in-memory reference implementation.
//! - [`cli`]: the `dhcv6d` binary's argument parsing and exit codes.

pub mod cli;
pub mod config;
pub mod decoder;
pub mod domain;
pub mod duid;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod handler;
pub mod listener;
pub mod message;
pub mod options;
pub mod pipeline;
pub mod registry;
pub mod stats;
pub mod store;
pub mod transaction;
pub mod worker;

pub use decoder::{Decodable, Decoder};
pub use encoder::{Encodable, Encoder};
pub use error::{
    ConfigError, DecodeError, DecodeResult, EncodeError, EncodeResult, HandlerError, IoError,
    ServerError, StoreError,
};
pub use message::{Message, MessageType, CLIENT_PORT, SERVER_PORT};
pub use options::{DhcpOption, DhcpOptions, OptionCode};
