use crate::config::DatabaseConfig;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

/// Error enumeration shared by every repository backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<mongodb::error::Error> for RepositoryError {
    fn from(value: mongodb::error::Error) -> Self {
        Self::Unavailable(value.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for RepositoryError {
    fn from(value: mongodb::bson::ser::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

impl From<mongodb::bson::de::Error> for RepositoryError {
    fn from(value: mongodb::bson::de::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

/// Open the shared database handle.
///
/// Called once at startup; the returned handle is cloned into each
/// repository. Reconnection after transient failures is the driver pool's
/// job, so nothing here retries.
pub async fn connect(config: &DatabaseConfig) -> Result<Database, RepositoryError> {
    let mut options = ClientOptions::parse(&config.uri).await?;
    options.app_name = Some("khoroolol".to_string());

    let client = Client::with_options(options)?;
    Ok(client.database(&config.database))
}
