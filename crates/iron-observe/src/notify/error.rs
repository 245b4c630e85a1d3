use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
