//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod reqwest_http_transport;

pub use reqwest_http_transport::ReqwestHttpTransport;
