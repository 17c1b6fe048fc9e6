//! File-backed storage for the Abode record store.
//!
//! One JSON snapshot holds every address and document record; document bytes
//! live in a flat uploads directory beside it. Snapshot writes go through a
//! temp file and a rename, so a reader only ever sees a complete snapshot.

mod persist;
mod store;

pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::FileStore;
