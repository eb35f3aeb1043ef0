// cartela/src/clients/mod.rs
// Client side of the billing protocol.
//
// - common: error body decoding and JSON request helpers
// - api_client: the HTTP implementation of `BillingBackend`

pub mod api_client;
pub mod common;
