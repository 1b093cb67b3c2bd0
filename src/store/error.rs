// src/store/error.rs

/// Why a single Record Store operation failed.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("store api error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("decode error: {context}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
