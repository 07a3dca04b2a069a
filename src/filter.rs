//! Keyword filter for record streams.
//!
//! [`ContainsFilter`] sits between two pipeline stages and lets a record through
//! only if at least one of its literal values contains a configured keyword as a
//! whole word. Records are captured in a [`RecordBuffer`] while they stream in;
//! at record end the filter either replays the whole record downstream or drops
//! it without emitting anything. Partial records never leave the filter.
//!
//! # Examples
//!
//! ```
//! use bibsift::event::{EventCollector, StreamReceiver};
//! use bibsift::filter::ContainsFilter;
//! use bibsift::matcher::KeywordMatcher;
//!
//! # fn main() -> bibsift::Result<()> {
//! let matcher = KeywordMatcher::from_whitespace_separated("HT012734817 HT012734833")?;
//! let mut filter = ContainsFilter::new(matcher, EventCollector::new());
//!
//! filter.start_record("A")?;
//! filter.literal("035", "HT012734817")?;
//! filter.end_record()?;
//!
//! filter.start_record("B")?;
//! filter.literal("035", "XHT012734817Y")?;
//! filter.end_record()?;
//!
//! assert_eq!(filter.receiver().record_count(), 1);
//! assert_eq!(filter.stats().records_discarded, 1);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::RecordBuffer;
use crate::error::Result;
use crate::event::StreamReceiver;
use crate::matcher::KeywordMatcher;

/// Running counts of a filter's decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Records that reached record end
    pub records_seen: usize,
    /// Records replayed downstream
    pub records_accepted: usize,
    /// Records dropped because no literal matched
    pub records_discarded: usize,
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records seen, {} accepted, {} discarded",
            self.records_seen, self.records_accepted, self.records_discarded
        )
    }
}

/// Buffering stream pipe that forwards only records with a keyword match.
///
/// The filter is a plain state machine: `Idle` until a record starts,
/// `Buffering` until it ends, then back to `Idle` once the record has been
/// replayed or dropped. It holds at most one record at a time and is meant to
/// be driven from a single thread.
#[derive(Debug)]
pub struct ContainsFilter<R> {
    matcher: Arc<KeywordMatcher>,
    buffer: RecordBuffer,
    record_id: String,
    accepted: bool,
    receiver: R,
    stats: FilterStats,
}

impl<R: StreamReceiver> ContainsFilter<R> {
    /// Creates a filter that owns its matcher.
    pub fn new(matcher: KeywordMatcher, receiver: R) -> Self {
        Self::with_matcher(Arc::new(matcher), receiver)
    }

    /// Creates a filter sharing an already compiled matcher.
    pub fn with_matcher(matcher: Arc<KeywordMatcher>, receiver: R) -> Self {
        Self {
            matcher,
            buffer: RecordBuffer::new(),
            record_id: String::new(),
            accepted: false,
            receiver,
            stats: FilterStats::default(),
        }
    }

    /// The matcher deciding acceptance.
    #[must_use]
    pub fn matcher(&self) -> &KeywordMatcher {
        &self.matcher
    }

    /// Counts of records seen, accepted and discarded so far.
    #[must_use]
    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// True while a record is being buffered.
    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.buffer.is_open()
    }

    /// The downstream stage.
    #[must_use]
    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    /// Mutable access to the downstream stage.
    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }

    /// Consumes the filter and returns the downstream stage.
    pub fn into_receiver(self) -> R {
        self.receiver
    }

    fn dispatch(&mut self) -> Result<()> {
        self.stats.records_seen += 1;

        let outcome = if self.accepted {
            self.stats.records_accepted += 1;
            debug!(record = %self.record_id, events = self.buffer.len(), "record accepted");
            self.buffer.replay(&mut self.receiver)
        } else {
            self.stats.records_discarded += 1;
            debug!(record = %self.record_id, "record discarded");
            Ok(())
        };

        self.buffer.clear();
        self.accepted = false;
        outcome
    }

    fn discard_partial(&mut self) {
        self.buffer.clear();
        self.accepted = false;
    }
}

impl<R: StreamReceiver> StreamReceiver for ContainsFilter<R> {
    fn start_record(&mut self, id: &str) -> Result<()> {
        self.buffer.start(id)?;
        self.record_id.clear();
        self.record_id.push_str(id);
        self.accepted = false;
        Ok(())
    }

    fn end_record(&mut self) -> Result<()> {
        self.buffer.end()?;
        self.dispatch()
    }

    fn start_entity(&mut self, name: &str) -> Result<()> {
        self.buffer.start_entity(name)
    }

    fn end_entity(&mut self) -> Result<()> {
        self.buffer.end_entity()
    }

    fn literal(&mut self, name: &str, value: &str) -> Result<()> {
        self.buffer.literal(name, value)?;
        if !self.accepted && self.matcher.is_match(value) {
            self.accepted = true;
        }
        Ok(())
    }

    fn reset_stream(&mut self) -> Result<()> {
        self.discard_partial();
        self.receiver.reset_stream()
    }

    fn close_stream(&mut self) -> Result<()> {
        self.discard_partial();
        self.receiver.close_stream()
    }
}
