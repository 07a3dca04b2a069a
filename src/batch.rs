//! Batch drivers and operator-facing run reports.
//!
//! A batch run pushes a whole input through one pipeline and reports how many
//! records were filtered out and how many documents failed to encode, so that
//! "nothing matched" can be told apart from "processing broke".
//!
//! # Examples
//!
//! ```
//! use bibsift::batch::{filter_batch, BatchReport};
//! use bibsift::event::{EventCollector, StreamEvent};
//! use bibsift::filter::ContainsFilter;
//! use bibsift::matcher::KeywordMatcher;
//!
//! # fn main() -> bibsift::Result<()> {
//! let events = vec![
//!     StreamEvent::record_start("A"),
//!     StreamEvent::literal("035", "HT012734817"),
//!     StreamEvent::RecordEnd,
//!     StreamEvent::record_start("B"),
//!     StreamEvent::literal("035", "HT000000000"),
//!     StreamEvent::RecordEnd,
//! ];
//! let matcher = KeywordMatcher::new(["HT012734817"])?;
//! let mut filter = ContainsFilter::new(matcher, EventCollector::new());
//!
//! let stats = filter_batch(events, &mut filter)?;
//! let report = BatchReport::from_filter(stats);
//! assert_eq!(report.filter.records_discarded, 1);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use tracing::{error, info};

use crate::error::Result;
use crate::event::{ObjectReceiver, StreamEvent, StreamReceiver};
use crate::filter::{ContainsFilter, FilterStats};
use crate::splitter::{GraphEncoder, ItemSplitter, ParsedRecordMap, SplitDocument, SplitStats};

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Filter decisions
    pub filter: FilterStats,
    /// Splitter output
    pub split: SplitStats,
}

impl BatchReport {
    /// Report for a filtering run.
    #[must_use]
    pub fn from_filter(filter: FilterStats) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Report for a splitting run.
    #[must_use]
    pub fn from_split(split: SplitStats) -> Self {
        Self {
            split,
            ..Self::default()
        }
    }

    /// True if any document was skipped because it failed to encode.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.split.failed > 0
    }

    /// Logs the report at `info` level.
    pub fn log(&self) {
        info!(
            records_seen = self.filter.records_seen,
            records_accepted = self.filter.records_accepted,
            records_discarded = self.filter.records_discarded,
            documents_emitted = self.split.emitted(),
            documents_failed = self.split.failed,
            "batch finished"
        );
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filtered: {} accepted, {} discarded of {}; split: {} documents emitted, {} failed",
            self.filter.records_accepted,
            self.filter.records_discarded,
            self.filter.records_seen,
            self.split.emitted(),
            self.split.failed
        )
    }
}

/// Pushes every event through `filter`, then closes the stream.
///
/// On a structural error the filter is reset, so the partial record is dropped
/// and downstream stages see a reset, and the error is returned.
///
/// # Errors
///
/// Returns the first error raised by the filter or a downstream stage.
pub fn filter_batch<I, R>(events: I, filter: &mut ContainsFilter<R>) -> Result<FilterStats>
where
    I: IntoIterator<Item = StreamEvent>,
    R: StreamReceiver,
{
    for event in events {
        if let Err(err) = event.dispatch_to(filter) {
            error!(event = event.kind(), error = %err, "aborting filter batch");
            filter.reset_stream()?;
            return Err(err);
        }
    }
    filter.close_stream()?;
    Ok(filter.stats())
}

/// Splits every parsed record, then closes the stream.
///
/// # Errors
///
/// Returns the first structural error (missing identifiers, malformed item
/// lists) or receiver error. Encoding failures are counted, not returned.
pub fn split_batch<I, R, E>(records: I, splitter: &mut ItemSplitter<R, E>) -> Result<SplitStats>
where
    I: IntoIterator<Item = ParsedRecordMap>,
    R: ObjectReceiver<SplitDocument>,
    E: GraphEncoder,
{
    for record in records {
        if let Err(err) = splitter.split(record) {
            error!(error = %err, "aborting split batch");
            return Err(err);
        }
    }
    ObjectReceiver::<ParsedRecordMap>::close_stream(splitter)?;
    Ok(splitter.stats())
}
