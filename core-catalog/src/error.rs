use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog unreachable ({source_name}): {error}")]
    Unreachable {
        source_name: String,
        #[source]
        error: BridgeError,
    },

    #[error("Catalog malformed: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
