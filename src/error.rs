//! Failure reasons for endpoint validation
//!
//! Every way a candidate endpoint can be rejected has its own variant so that
//! tests and logs can tell them apart. Callers that only need a verdict use
//! [`crate::validator::EndpointValidator::is_endpoint_safe`], which maps all of
//! them to `false`.

use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

/// Why a resolved address is not an acceptable destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    Loopback,
    LinkLocal,
    /// 224.0.0.0/24, the local network control block
    LocalNetworkControl,
    /// Inside a network listed in the blocklist configuration
    Configured(IpNet),
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressClass::Loopback => write!(f, "loopback address"),
            AddressClass::LinkLocal => write!(f, "link-local address"),
            AddressClass::LocalNetworkControl => write!(f, "address in 224.0.0.0/24"),
            AddressClass::Configured(net) => write!(f, "address in blocked network {}", net),
        }
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("scheme '{0}' is not allowed, only http and https")]
    Scheme(String),

    #[error("URL has no '//' authority after the scheme")]
    MissingAuthority,

    #[error("port {0} is not allowed")]
    Port(u16),

    #[error("URL has no usable port")]
    MissingPort,

    #[error("URL has no host")]
    BlankHost,

    #[error("host '{0}' is blocked by configuration")]
    BlockedHost(String),

    #[error("could not resolve '{host}': {reason}")]
    Resolution { host: String, reason: String },

    #[error("'{host}' resolves to {addr}, a {class}")]
    BlockedAddress {
        host: String,
        addr: IpAddr,
        class: AddressClass,
    },

    #[error("no endpoint given")]
    Blank,
}

impl EndpointError {
    /// Short, stable label for the failure class, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            EndpointError::InvalidUrl(_) | EndpointError::MissingAuthority | EndpointError::Blank => {
                "url"
            }
            EndpointError::Scheme(_) => "scheme",
            EndpointError::Port(_) | EndpointError::MissingPort => "port",
            EndpointError::BlankHost | EndpointError::BlockedHost(_) => "host",
            EndpointError::Resolution { .. } => "resolution",
            EndpointError::BlockedAddress { .. } => "ip",
        }
    }
}
