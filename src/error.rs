use std::path::PathBuf;

/// Errors raised while setting up a sampling run.
///
/// Nothing below the submission boundary produces one of these: spoofing and
/// signal failures are converted to data inside the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("failed to read config {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid profile table: {0}")]
    InvalidProfiles(String),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T, E = SamplerError> = std::result::Result<T, E>;
