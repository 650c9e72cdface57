//! # Book API
//!
//! Everything that talks to the REST backend: the JSON transport, the wire
//! types, and the endpoint catalogue the resource cache runs on.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod types;

pub use client::{ApiRequest, HttpClient, HttpError, Transport};
pub use endpoints::BookApi;
pub use error::ClientError;
pub use types::{Book, Credentials, NewBook, Registration, TokenResponse};
