//! Core types and trait definitions for the Abode address-history store.
//!
//! This crate is free of filesystem and HTTP dependencies. It holds the
//! domain records, the [`store::RecordStore`] abstraction implemented by
//! storage backends, and the pure coverage-gap engine in [`gaps`].

pub mod address;
pub mod date;
pub mod document;
pub mod error;
pub mod gaps;
pub mod store;

pub use error::{Error, Result};
