use std::path::PathBuf;

/// Failure to obtain the site dataset. Terminal for the session.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("malformed dataset JSON: {0}")]
    Parse(#[from] simd_json::Error),

    #[error("dataset loader stopped without a result")]
    LoaderStopped,
}
