//! Error types for the codec, configuration, handler pipeline and stores.
//!
//! Each kind below corresponds to one of the propagation boundaries in the
//! spec: decode/encode failures never cross into handler code as anything
//! but a dropped datagram or a stripped option; handler failures never
//! abort a worker; store failures become either a drop or a status-code
//! option, at the handler's discretion.

use std::array::TryFromSliceError;
use std::ffi::FromBytesWithNulError;
use std::str::Utf8Error;

use thiserror::Error;

/// Convenience type for decode errors
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Returned from types that decode
#[derive(Error, Debug)]
pub enum DecodeError {
    /// add overflow
    #[error("decoder checked_add failed")]
    AddOverflow,

    /// ran out of bytes
    #[error("parser ran out of data-- not enough bytes")]
    NotEnoughBytes,

    /// error converting from slice
    #[error("error converting from slice {0}")]
    SliceError(#[from] TryFromSliceError),

    /// error finding nul in string
    #[error("error getting null terminated string {0}")]
    NulError(#[from] FromBytesWithNulError),

    /// error converting to utf-8
    #[error("error converting to UTF-8 {0}")]
    Utf8Error(#[from] Utf8Error),

    /// invalid data error: option or message failed a structural invariant
    #[error("invalid data error: {0}")]
    InvalidData(String),

    /// an option's declared length did not match the bytes actually
    /// available in its container
    #[error("option {code} declares length {declared} but only {available} bytes remain")]
    BadOptionLength {
        /// option code
        code: u16,
        /// length byte(s) on the wire
        declared: u16,
        /// bytes actually available
        available: usize,
    },

    /// a message type byte did not match any known DHCPv6 message kind
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),

    /// nested container decoding exceeded the configured recursion limit
    #[error("recursion limit ({0}) exceeded while decoding nested options")]
    RecursionLimit(u32),

    /// Unknown decode error, wraps an arbitrary source for ad-hoc extension code
    #[error("unknown decode error: {0}")]
    Unknown(Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Returned from types that encode
#[derive(Error, Debug)]
pub enum EncodeError {
    /// addition overflow
    #[error("encoder checked_add failed")]
    AddOverflow,

    /// string exceeds bounds
    #[error(
        "message is trying to write a string to the message that exceeds the max size of {len}"
    )]
    StringSizeTooBig {
        /// size of string
        len: usize,
    },

    /// encoding would produce an option whose invariants are violated
    /// (e.g. preferred-lifetime > valid-lifetime within an IA)
    #[error("invalid data error: {0}")]
    InvalidData(String),
}

/// Convenience type for encode errors
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Errors raised while building or reloading the option registry and the
/// handler/filter pipeline from a configuration tree. Fatal at startup;
/// reported on the control channel (and the old pipeline kept) on reload.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// the configuration tree contained a section name the core does not
    /// recognize
    #[error("unknown configuration section: {0}")]
    UnknownSection(String),

    /// a required key was missing from a section
    #[error("section {section} is missing required key {key}")]
    MissingKey {
        /// section name
        section: String,
        /// key name
        key: String,
    },

    /// two extensions tried to register the same option code or DUID type
    #[error("duplicate registration for code {0}")]
    DuplicateRegistration(u16),

    /// a handler factory name did not resolve to a registered constructor
    #[error("no handler factory registered for kind {0}")]
    UnknownHandlerKind(String),

    /// a handler's own parameters failed validation during construction
    #[error("failed to construct handler {kind}: {message}")]
    HandlerConstruction {
        /// handler kind name
        kind: String,
        /// underlying reason
        message: String,
    },

    /// a `subnet-match` filter's network/prefix-len pair is not a valid
    /// IPv6 network
    #[error("invalid subnet {network}/{prefix_len}: {source}")]
    InvalidSubnet {
        /// network address as configured
        network: std::net::Ipv6Addr,
        /// prefix length as configured
        prefix_len: u8,
        /// underlying parse failure
        #[source]
        source: ipnet::PrefixLenError,
    },

    /// the underlying YAML/structured-tree deserialization failed
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// generic I/O failure while reading the configuration source
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a handler during the pre or handle phase. Caught by
/// the pipeline, logged with the transaction id, and translated into
/// `disposition = drop`.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// the handler encountered a condition it cannot recover from
    #[error("handler {handler} failed: {message}")]
    Failed {
        /// handler name, for correlating with configuration
        handler: String,
        /// human-readable reason
        message: String,
    },

    /// the handler's dependency on an external store failed
    #[error("handler {handler} store error: {0}", handler = .1)]
    Store(#[source] StoreError, String),
}

/// Errors surfaced by a lease/identity store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// the backend could not be reached at all
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    /// a lock or remote call did not complete before the per-transaction
    /// deadline
    #[error("store operation timed out")]
    Timeout,

    /// the request referenced a lease/binding the store has no record of
    #[error("no such binding")]
    NoBinding,

    /// the store has no addresses/prefixes left to allocate
    #[error("pool exhausted")]
    PoolExhausted,
}

/// I/O failures: socket bind, send, or control-socket errors.
#[derive(Error, Debug)]
pub enum IoError {
    /// failed to bind a listening socket
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// address that failed to bind
        addr: String,
        /// underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// failed to send an outbound datagram (buffer full, unreachable, etc)
    #[error("failed to send to {addr}: {source}")]
    Send {
        /// destination address
        addr: String,
        /// underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// the control socket failed to bind, accept, or read
    #[error("control socket error: {0}")]
    ControlSocket(std::io::Error),
}

/// Umbrella error used at the CLI/control-channel boundary where a single
/// propagation type is convenient; the library code otherwise uses the
/// specific kind above so callers can match on cause.
#[derive(Error, Debug)]
pub enum ServerError {
    /// wire codec error
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// wire codec error
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// handler error
    #[error(transparent)]
    Handler(#[from] HandlerError),
    /// store error
    #[error(transparent)]
    Store(#[from] StoreError),
    /// I/O error
    #[error(transparent)]
    Io(#[from] IoError),
}
