//! # hp-client
//!
//! Blocking REST client for the Hopaas optimization service, the transport
//! it runs on, and the local credentials file.

mod client;
mod config;
mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use client::Client;
pub use config::{ClientConfig, CONFIG_FILE_NAME};
pub use transport::{HttpResponse, HttpTransport, Transport};
