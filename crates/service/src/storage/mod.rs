//! Storage abstractions for the service layer
//!
//! The record collection lives behind [`CollectionStore`]; the file-backed
//! implementation persists it as a single JSON document.

pub mod collection_store;
pub mod json_collection_store;

pub use collection_store::{next_id, CollectionStore};
pub use json_collection_store::JsonCollectionStore;
