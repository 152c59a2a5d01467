// hookgate: SSRF safety gate for outbound webhook endpoints
// Exposes the endpoint validator and its building blocks as a library

pub mod blocklist;
pub mod classify;
pub mod cli;
pub mod dns;
pub mod error;
pub mod ports;
pub mod sanitize;
pub mod validator;

pub use error::{AddressClass, EndpointError};
pub use validator::{EndpointValidator, ValidatorConfig};
