use fedspeak_core::PipelineError;
use thiserror::Error;

/// Errors raised while reading or writing tables.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Malformed(#[from] PipelineError),
}

impl DataError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: impl AsRef<std::path::Path>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
