/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod info;
pub mod trade;
pub mod user;

pub use error::{ExchangeError, Result};

pub use client::{ClientConfig, ExchangeHttpClient};
pub use trade::PlaceOrderParams;
