//! CRUD operations over the product collection.

pub mod service;

pub use service::ProductService;
