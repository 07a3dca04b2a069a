//! Stream vocabulary shared by every pipeline stage.
//!
//! A bibliographic record travels through the pipeline as a flat sequence of
//! [`StreamEvent`]s: one `RecordStart`, any number of well-nested entity scopes
//! and literals, and one `RecordEnd`. Stages implement [`StreamReceiver`] and
//! push each event straight into the next stage before returning, so the whole
//! chain runs synchronously on the caller's thread.
//!
//! Stages that turn a record into a single value (an encoded string, a split
//! document) hand it on through [`ObjectReceiver`].
//!
//! # Examples
//!
//! ```
//! use bibsift::event::{EventCollector, StreamEvent, StreamReceiver};
//!
//! # fn main() -> bibsift::Result<()> {
//! let mut collector = EventCollector::new();
//! collector.start_record("1")?;
//! collector.literal("001", "HT012734817")?;
//! collector.end_record()?;
//!
//! assert_eq!(collector.events()[1], StreamEvent::literal("001", "HT012734817"));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One event of a record stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Opens a record.
    RecordStart {
        /// Record identifier as supplied by the decoder
        id: String,
    },
    /// Closes the current record.
    RecordEnd,
    /// Opens a named entity scope inside the current record.
    EntityStart {
        /// Entity name (for MARC data fields: tag plus indicators)
        name: String,
    },
    /// Closes the innermost open entity.
    EntityEnd,
    /// A leaf name/value pair.
    Literal {
        /// Literal name
        name: String,
        /// Literal value
        value: String,
    },
}

impl StreamEvent {
    /// Creates a `RecordStart` event.
    pub fn record_start(id: impl Into<String>) -> Self {
        StreamEvent::RecordStart { id: id.into() }
    }

    /// Creates an `EntityStart` event.
    pub fn entity_start(name: impl Into<String>) -> Self {
        StreamEvent::EntityStart { name: name.into() }
    }

    /// Creates a `Literal` event.
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        StreamEvent::Literal {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Short name of the event kind, used in error messages and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            StreamEvent::RecordStart { .. } => "record start",
            StreamEvent::RecordEnd => "record end",
            StreamEvent::EntityStart { .. } => "entity start",
            StreamEvent::EntityEnd => "entity end",
            StreamEvent::Literal { .. } => "literal",
        }
    }

    /// Forwards this event to the matching method of `receiver`.
    ///
    /// Live forwarding and buffered replay both go through here, so a replayed
    /// record reaches downstream stages exactly as a live one would.
    ///
    /// # Errors
    ///
    /// Returns whatever error the receiver reports.
    pub fn dispatch_to<R: StreamReceiver + ?Sized>(&self, receiver: &mut R) -> Result<()> {
        match self {
            StreamEvent::RecordStart { id } => receiver.start_record(id),
            StreamEvent::RecordEnd => receiver.end_record(),
            StreamEvent::EntityStart { name } => receiver.start_entity(name),
            StreamEvent::EntityEnd => receiver.end_entity(),
            StreamEvent::Literal { name, value } => receiver.literal(name, value),
        }
    }
}

/// A pipeline stage consuming record events.
///
/// Every method returns a [`Result`] so that a stage detecting a broken stream
/// (for example unbalanced entities) can abort the whole chain with `?`.
pub trait StreamReceiver {
    /// Called at the start of a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot accept a new record.
    fn start_record(&mut self, id: &str) -> Result<()>;

    /// Called at the end of a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is structurally incomplete.
    fn end_record(&mut self) -> Result<()>;

    /// Called when an entity scope opens.
    ///
    /// # Errors
    ///
    /// Returns an error if no record is open.
    fn start_entity(&mut self, name: &str) -> Result<()>;

    /// Called when the innermost entity scope closes.
    ///
    /// # Errors
    ///
    /// Returns an error if no entity is open.
    fn end_entity(&mut self) -> Result<()>;

    /// Called for each literal.
    ///
    /// # Errors
    ///
    /// Returns an error if no record is open.
    fn literal(&mut self, name: &str, value: &str) -> Result<()>;

    /// Drops any partial state and propagates the reset downstream.
    ///
    /// # Errors
    ///
    /// Returns an error only if a downstream stage fails to reset.
    fn reset_stream(&mut self) -> Result<()> {
        Ok(())
    }

    /// Signals the end of the stream and propagates it downstream.
    ///
    /// # Errors
    ///
    /// Returns an error only if a downstream stage fails to close.
    fn close_stream(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: StreamReceiver + ?Sized> StreamReceiver for &mut R {
    fn start_record(&mut self, id: &str) -> Result<()> {
        (**self).start_record(id)
    }

    fn end_record(&mut self) -> Result<()> {
        (**self).end_record()
    }

    fn start_entity(&mut self, name: &str) -> Result<()> {
        (**self).start_entity(name)
    }

    fn end_entity(&mut self) -> Result<()> {
        (**self).end_entity()
    }

    fn literal(&mut self, name: &str, value: &str) -> Result<()> {
        (**self).literal(name, value)
    }

    fn reset_stream(&mut self) -> Result<()> {
        (**self).reset_stream()
    }

    fn close_stream(&mut self) -> Result<()> {
        (**self).close_stream()
    }
}

/// A pipeline stage consuming whole values, one per record or document.
pub trait ObjectReceiver<T> {
    /// Consumes one value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be handed on.
    fn process(&mut self, obj: T) -> Result<()>;

    /// Drops any partial state.
    ///
    /// # Errors
    ///
    /// Returns an error only if a downstream stage fails to reset.
    fn reset_stream(&mut self) -> Result<()> {
        Ok(())
    }

    /// Signals the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error only if a downstream stage fails to close.
    fn close_stream(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T> ObjectReceiver<T> for Vec<T> {
    fn process(&mut self, obj: T) -> Result<()> {
        self.push(obj);
        Ok(())
    }
}

impl<T, R: ObjectReceiver<T> + ?Sized> ObjectReceiver<T> for &mut R {
    fn process(&mut self, obj: T) -> Result<()> {
        (**self).process(obj)
    }

    fn reset_stream(&mut self) -> Result<()> {
        (**self).reset_stream()
    }

    fn close_stream(&mut self) -> Result<()> {
        (**self).close_stream()
    }
}

/// Terminal stage that records every event it receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCollector {
    events: Vec<StreamEvent>,
    resets: usize,
    closes: usize,
}

impl EventCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// Consumes the collector and returns the received events.
    #[must_use]
    pub fn into_events(self) -> Vec<StreamEvent> {
        self.events
    }

    /// Number of `RecordStart` events received.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, StreamEvent::RecordStart { .. }))
            .count()
    }

    /// Number of `reset_stream` calls received.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of `close_stream` calls received.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.closes
    }
}

impl StreamReceiver for EventCollector {
    fn start_record(&mut self, id: &str) -> Result<()> {
        self.events.push(StreamEvent::record_start(id));
        Ok(())
    }

    fn end_record(&mut self) -> Result<()> {
        self.events.push(StreamEvent::RecordEnd);
        Ok(())
    }

    fn start_entity(&mut self, name: &str) -> Result<()> {
        self.events.push(StreamEvent::entity_start(name));
        Ok(())
    }

    fn end_entity(&mut self) -> Result<()> {
        self.events.push(StreamEvent::EntityEnd);
        Ok(())
    }

    fn literal(&mut self, name: &str, value: &str) -> Result<()> {
        self.events.push(StreamEvent::literal(name, value));
        Ok(())
    }

    fn reset_stream(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }

    fn close_stream(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}
