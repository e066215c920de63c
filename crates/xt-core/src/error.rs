use thiserror::Error;

/// Fatal failures of a dump run.
#[derive(Debug, Error)]
pub enum DumpError {
    /// The backend store could not be opened
    #[error("{0}")]
    Init(String),

    /// The output sink could not be opened or written
    #[error("output error: {0}")]
    Output(#[source] std::io::Error),

    /// The backend failed while reading a table
    #[error("failed to read table '{table}': {message}")]
    Backend { table: String, message: String },
}

impl DumpError {
    pub fn backend(table: &str, message: impl Into<String>) -> Self {
        DumpError::Backend {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for DumpError {
    fn from(err: std::io::Error) -> Self {
        DumpError::Output(err)
    }
}

pub type DumpResult<T> = Result<T, DumpError>;
