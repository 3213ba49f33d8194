use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed CSS selector {selector:?}: {source}")]
    BadSelector { selector: String, source: String },

    #[error("article rejected: {0}")]
    Rejected(String),

    #[error("classifier request failed: {0}")]
    Classifier(#[from] reqwest::Error),

    #[error("classifier returned an unexpected response: {0}")]
    ClassifierResponse(String),
}
