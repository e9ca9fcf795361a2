use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingStoreError {
    #[error("Mapping storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Failed to decode mapping entry: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Mapping table error: {0}")]
    MySql(#[from] mysql_async::Error),
}

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("State storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Failed to encode progress token: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to save progress token: {0}")]
    SaveToken(String),
}
