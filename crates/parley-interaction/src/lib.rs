//! Backend integrations for Parley.
//!
//! Currently a single HTTP transport for Parlant-style session backends.

pub mod parlant_client;

pub use parlant_client::ParlantHttpClient;
