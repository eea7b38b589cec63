use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read shoes file {path}: {source}")]
    ShoesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse shoes file: {0}")]
    ShoesFileParse(#[from] serde_yaml::Error),

    #[error("invalid shoe catalog: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown source kind: {0} (expected video or social)")]
    UnknownSourceKind(String),
}
