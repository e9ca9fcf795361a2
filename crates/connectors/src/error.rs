use thiserror::Error;

/// Errors raised while reading from a legacy shop.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse fixture {file}: {source}")]
    Fixture {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid profile configuration: {0}")]
    Config(String),
}

impl ProfileError {
    /// Whether retrying the same query may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProfileError::MySql(err) => matches!(
                err,
                mysql_async::Error::Io(_) | mysql_async::Error::Driver(_)
            ),
            ProfileError::Io(_) => true,
            _ => false,
        }
    }
}

/// Errors raised by the target shop schema.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("Row {entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("Counter '{0}' does not exist")]
    MissingCounter(String),

    #[error("Failed to encode {0}")]
    Encode(String),

    #[error("Insert into {0} returned no id")]
    NoInsertId(&'static str),

    #[error("Transaction already finished")]
    Finished,
}

/// Errors raised while fetching images and downloads.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },
}
