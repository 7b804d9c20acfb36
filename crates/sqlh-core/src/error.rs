use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to acquire connection: {0}")]
    Connection(#[source] sqlx::Error),

    /// The engine rejected a statement. The transaction has already been
    /// rolled back when this is returned.
    #[error("{source}")]
    Execution {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No value supplied for parameter ':{0}'")]
    UnboundParameter(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot decode column '{column}' of type {type_name}")]
    Decode { column: String, type_name: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use sqlh_core::Error;
    /// let err = Error::config_error("Unsupported dialect in: oracle://db");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating validation errors
    ///
    /// # Example
    /// ```
    /// use sqlh_core::Error;
    /// let err = Error::validation("batch_size must be greater than zero");
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    /// Wrap an engine error raised while running `statement`
    pub fn execution(statement: impl Into<String>, source: sqlx::Error) -> Self {
        Error::Execution {
            statement: statement.into(),
            source,
        }
    }

    /// The statement text attached to an execution error, if any
    pub fn statement(&self) -> Option<&str> {
        match self {
            Error::Execution { statement, .. } => Some(statement),
            _ => None,
        }
    }
}
