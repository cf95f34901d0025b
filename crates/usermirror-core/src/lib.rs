//! Core types and the dispatch flow for the usermirror webhook receiver.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend plugs in through [`store::UserStore`]; the HTTP layer feeds
//! decoded [`event::Event`]s into [`sync::dispatch`].

pub mod error;
pub mod event;
pub mod store;
pub mod sync;
pub mod user;

pub use error::{Error, Result};
