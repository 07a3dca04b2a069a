//! Error types for stream filtering and splitting.
//!
//! This module provides the [`SiftError`] type for all crate operations
//! and the [`Result`] convenience type.
//!
//! Errors fall into three groups:
//! - **Structural** (unbalanced nesting, missing identifiers): the upstream
//!   producer broke its contract and the current record or batch must be
//!   abandoned.
//! - **Serialization**: a single document could not be encoded. The splitter
//!   recovers from these locally; they only surface here when a caller
//!   encodes directly.
//! - **Input** (XML, IO, invalid patterns): configuration or source problems.

use thiserror::Error;

/// Error type for all `bibsift` operations.
#[derive(Error, Debug)]
pub enum SiftError {
    /// A record was started while another one was still being captured.
    #[error("Record already open: cannot start {new_id:?} while {open_id:?} is in flight")]
    RecordAlreadyOpen {
        /// Identifier of the record currently in flight
        open_id: String,
        /// Identifier of the record that tried to start
        new_id: String,
    },

    /// An event other than a record start arrived outside of any record.
    #[error("No open record: received {0} outside of a record")]
    NoOpenRecord(&'static str),

    /// An entity end arrived without a matching entity start.
    #[error("Unbalanced entity: end of entity without matching start in record {0:?}")]
    UnbalancedEntity(String),

    /// A record ended while entities were still open.
    #[error("Unclosed entities: record {id:?} ended with {open} open entit(y/ies)")]
    UnclosedEntities {
        /// Identifier of the record
        id: String,
        /// Number of entities still open at record end
        open: usize,
    },

    /// The resource identifier field is absent or not a scalar.
    #[error("Missing identifier: field {0:?} absent or not a string")]
    MissingIdentifier(String),

    /// The item list field is present but not a list of maps.
    #[error("Invalid items in resource {resource_id:?}: {reason}")]
    InvalidItems {
        /// Identifier of the parent resource
        resource_id: String,
        /// What was wrong with the item list
        reason: String,
    },

    /// A child item carries no identifier.
    #[error("Missing item identifier: item #{index} of resource {resource_id:?} has no id")]
    MissingItemIdentifier {
        /// Identifier of the parent resource
        resource_id: String,
        /// Zero-based position of the item in the item list
        index: usize,
    },

    /// A document could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configured regular expression failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The keyword automaton could not be built.
    #[error("Matcher error: {0}")]
    Matcher(String),

    /// Malformed XML input.
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SiftError {
    /// Returns true for errors that mean the event stream itself is broken.
    ///
    /// Structural errors abort the current batch; everything else is either
    /// recoverable per document or a configuration/input problem.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::RecordAlreadyOpen { .. }
                | Self::NoOpenRecord(_)
                | Self::UnbalancedEntity(_)
                | Self::UnclosedEntities { .. }
                | Self::MissingIdentifier(_)
                | Self::InvalidItems { .. }
                | Self::MissingItemIdentifier { .. }
        )
    }
}

impl From<quick_xml::Error> for SiftError {
    fn from(err: quick_xml::Error) -> Self {
        SiftError::Xml(err.to_string())
    }
}

impl From<aho_corasick::BuildError> for SiftError {
    fn from(err: aho_corasick::BuildError) -> Self {
        SiftError::Matcher(err.to_string())
    }
}

/// Convenience type alias for [`std::result::Result`] with [`SiftError`].
pub type Result<T> = std::result::Result<T, SiftError>;
