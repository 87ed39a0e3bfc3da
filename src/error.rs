//! The decoding-failure type shared by every feed kind.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid number in <{tag}>: {value:?}")]
    InvalidNumber {
        tag: String,
        value: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid date in <{tag}>: {value:?}")]
    InvalidDate {
        tag: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid boolean in <{tag}>: {value:?}")]
    InvalidBoolean { tag: String, value: String },

    /// The input ended before the document did, or held no element at all.
    #[error("incomplete document: {0}")]
    Incomplete(String),

    /// The feed answered with an error payload instead of data.
    #[error("feed error: {0}")]
    Feed(String),
}

impl DecodeError {
    /// The feed's own error text, if this failure was signaled by the feed.
    pub fn feed_message(&self) -> Option<&str> {
        match self {
            DecodeError::Feed(msg) => Some(msg),
            _ => None,
        }
    }

    /// Short machine-friendly label used in summary records.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Xml(_) => "xml_error",
            DecodeError::InvalidNumber { .. } => "invalid_number",
            DecodeError::InvalidDate { .. } => "invalid_date",
            DecodeError::InvalidBoolean { .. } => "invalid_boolean",
            DecodeError::Incomplete(_) => "incomplete_document",
            DecodeError::Feed(_) => "feed_error",
        }
    }
}
