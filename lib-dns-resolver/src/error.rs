//! Errors surfaced by transport and resolution.

use std::fmt;

use dns_types::protocol::{deserialise, serialise};
use dns_types::protocol::types::{DomainName, Rcode};

use crate::net::TcpError;

/// Errors from a single transport exchange (one UDP or TCP attempt).
/// These are always caught by the resolver's per-host retry loop; they
/// never escape to the caller directly.
#[derive(Debug)]
pub enum TransportError {
    Timeout,
    ConnectionError(std::io::Error),
    MalformedResponse,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "timed out"),
            TransportError::ConnectionError(err) => write!(f, "connection error: {err}"),
            TransportError::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::ConnectionError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<deserialise::Error> for TransportError {
    fn from(_: deserialise::Error) -> Self {
        TransportError::MalformedResponse
    }
}

impl From<TcpError> for TransportError {
    fn from(err: TcpError) -> Self {
        match err {
            TcpError::TooShort { .. } => TransportError::MalformedResponse,
            TcpError::IO { error } => TransportError::ConnectionError(error),
        }
    }
}

impl From<serialise::Error> for TransportError {
    fn from(_: serialise::Error) -> Self {
        TransportError::MalformedResponse
    }
}

/// The outcome of a whole resolution: either the transport-level errors
/// above, exhausted, or a terminal condition reported by a server.
#[derive(Debug)]
pub enum ResolutionError {
    /// The name given to `resolve` could not be encoded (too many
    /// labels, a label too long, or more than 255 octets total).
    MalformedName,
    /// A server's response did not match the request or could not be
    /// parsed.
    MalformedResponse,
    /// `MAX_RETRIES_PER_HOST` was reached against the current authority;
    /// non-fatal, caught internally and used to rotate hosts.
    HostRetryExceeded,
    /// `MAX_RETRIES` total attempts were used up across every authority
    /// tried.
    RetryExceeded,
    /// A server authoritatively reported the name does not exist.
    DnsNameError(DomainName),
    /// A server reported a failure other than `NAME_ERROR`.
    DnsError { rcode: Rcode, aa: bool },
    /// Walked up to the root and exhausted every known authority without
    /// a usable reply.
    NoRespondingServers,
    /// The message constructed for the outgoing query was invalid.
    Codec(serialise::Error),
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolutionError::MalformedName => write!(f, "malformed domain name"),
            ResolutionError::MalformedResponse => write!(f, "malformed response"),
            ResolutionError::HostRetryExceeded => write!(f, "host retry budget exceeded"),
            ResolutionError::RetryExceeded => write!(f, "retry budget exceeded"),
            ResolutionError::DnsNameError(name) => write!(f, "{name} does not exist"),
            ResolutionError::DnsError { rcode, aa } => {
                write!(f, "server returned {rcode} (aa={aa})")
            }
            ResolutionError::NoRespondingServers => write!(f, "no responding servers"),
            ResolutionError::Codec(err) => write!(f, "could not encode query: {err}"),
        }
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolutionError::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serialise::Error> for ResolutionError {
    fn from(err: serialise::Error) -> Self {
        ResolutionError::Codec(err)
    }
}
