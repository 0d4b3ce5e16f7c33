//! # Catalog
//!
//! The identifier → media mapping the correlation engine resolves decoded
//! text against. Loaded once from a [`CatalogSource`](bridge_traits::CatalogSource)
//! and read-only afterwards; descriptors are handed out as `Arc`s so the
//! engine and the voice allocator reference them without copying.

pub mod catalog;
pub mod error;
pub mod models;

pub use catalog::Catalog;
pub use error::{CatalogError, Result};
pub use models::MediaDescriptor;
