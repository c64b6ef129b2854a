//! Storage Adapters
//!
//! Implementations of the SessionFileStore port for temporary session uploads.
//!
//! ## Available Adapters
//!
//! - **LocalSessionFileStore** - Stores uploads per session on disk
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::LocalSessionFileStore;
//!
//! let store = LocalSessionFileStore::new("./data/sessions");
//! let stored = store.store(session_id, "io_list.csv", &bytes).await?;
//! ```

mod local_session_store;

pub use local_session_store::LocalSessionFileStore;
