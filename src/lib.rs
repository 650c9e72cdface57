//! Bookshelf library exports for testing

pub mod api;
pub mod cache;
pub mod core;
pub mod shell;

#[cfg(test)]
pub mod test_support;
