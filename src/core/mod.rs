//! # Core Application Logic
//!
//! This module contains Bookshelf's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • App (state + flows)  │
//!                    │  • Action / update()    │
//!                    │  • Session + navigation │
//!                    │  • Token store          │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │   Shell    │      │  Resource  │      │    HTTP    │
//!     │  Adapter   │      │   Cache    │      │   Client   │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct and the sign-in / sign-up / sign-out flows
//! - [`action`]: The `Action` enum and the session reducer
//! - [`session`]: The injected "is signed in" flag
//! - [`navigation`]: Screens, flows and the gate between them
//! - [`token_store`]: Where the auth token lives between runs
//! - [`validation`]: Form checks that run before any request
//! - [`config`]: Config file, env and CLI resolution

pub mod action;
pub mod config;
pub mod navigation;
pub mod session;
pub mod state;
pub mod token_store;
pub mod validation;

pub use action::{Action, Effect};
pub use session::SessionState;
pub use state::App;
