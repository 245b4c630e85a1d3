use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid service link '{0}' (expected service:tag)")]
    InvalidLink(String),
}
