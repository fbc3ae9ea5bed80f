// crates/common/src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid aggregation method: {0}")]
    UnknownAggregationMethod(String),

    #[error("Missing {intermediate}: run the {stage} stage first")]
    MissingStage {
        intermediate: &'static str,
        stage: &'static str,
    },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("No projects with positive scores found")]
    NoFundedProjects,
}

impl Error {
    /// Errors raised before any data was transformed.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::InvalidConfig(_) | Error::UnknownAggregationMethod(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
