//! Error types for the crawl frontier and fetcher.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontierError {
    #[error("storage error: {0}")]
    Storage(#[from] nc_storage::StorageError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url {0:?}: {1}")]
    InvalidUrl(String, String),

    #[error("disallowed by robots.txt: {0}")]
    RobotsDisallowed(String),
}

pub type Result<T> = std::result::Result<T, FrontierError>;
