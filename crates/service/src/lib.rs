//! Service layer for the product API.
//! - `storage`: the JSON file-backed record collection and its write gate.
//! - `products`: CRUD operations on top of a `CollectionStore`.
//! - `record`: the record model and payload shape coercion.

pub mod errors;
pub mod products;
pub mod record;
pub mod runtime;
pub mod storage;
