//! Capture of one record's events for deferred replay.
//!
//! [`RecordBuffer`] stores the events of the record currently in flight in
//! arrival order, checks that entity scopes nest properly, and can later replay
//! the captured record through any [`StreamReceiver`] or simply drop it.

use crate::error::{Result, SiftError};
use crate::event::{StreamEvent, StreamReceiver};

/// Ordered event log for a single in-flight record.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    events: Vec<StreamEvent>,
    /// Identifier of the open record, if any
    open_id: Option<String>,
    depth: usize,
}

impl RecordBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new capture.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::RecordAlreadyOpen`] if a record is already being
    /// captured; interleaving records on one buffer is a caller bug.
    pub fn start(&mut self, id: &str) -> Result<()> {
        if let Some(open_id) = &self.open_id {
            return Err(SiftError::RecordAlreadyOpen {
                open_id: open_id.clone(),
                new_id: id.to_string(),
            });
        }
        self.events.clear();
        self.depth = 0;
        self.open_id = Some(id.to_string());
        self.events.push(StreamEvent::record_start(id));
        Ok(())
    }

    /// Appends an entity start.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::NoOpenRecord`] outside of a record.
    pub fn start_entity(&mut self, name: &str) -> Result<()> {
        self.require_open("entity start")?;
        self.depth += 1;
        self.events.push(StreamEvent::entity_start(name));
        Ok(())
    }

    /// Appends a literal.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::NoOpenRecord`] outside of a record.
    pub fn literal(&mut self, name: &str, value: &str) -> Result<()> {
        self.require_open("literal")?;
        self.events.push(StreamEvent::literal(name, value));
        Ok(())
    }

    /// Appends an entity end.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::UnbalancedEntity`] if no entity is open, or
    /// [`SiftError::NoOpenRecord`] outside of a record.
    pub fn end_entity(&mut self) -> Result<()> {
        let id = self.require_open("entity end")?;
        if self.depth == 0 {
            return Err(SiftError::UnbalancedEntity(id.to_string()));
        }
        self.depth -= 1;
        self.events.push(StreamEvent::EntityEnd);
        Ok(())
    }

    /// Appends the record end and closes the capture.
    ///
    /// The captured events stay available for [`replay`](Self::replay) until
    /// [`clear`](Self::clear) is called.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::UnclosedEntities`] if entities are still open, or
    /// [`SiftError::NoOpenRecord`] outside of a record.
    pub fn end(&mut self) -> Result<()> {
        let id = self.require_open("record end")?;
        if self.depth > 0 {
            return Err(SiftError::UnclosedEntities {
                id: id.to_string(),
                open: self.depth,
            });
        }
        self.events.push(StreamEvent::RecordEnd);
        self.open_id = None;
        Ok(())
    }

    /// Re-emits every captured event, in order, to `receiver`.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the receiver.
    pub fn replay<R: StreamReceiver + ?Sized>(&self, receiver: &mut R) -> Result<()> {
        for event in &self.events {
            event.dispatch_to(receiver)?;
        }
        Ok(())
    }

    /// Discards the captured events and any open record.
    pub fn clear(&mut self) {
        self.events.clear();
        self.open_id = None;
        self.depth = 0;
    }

    /// The captured events.
    #[must_use]
    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// Number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing is captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True while a record is being captured.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open_id.is_some()
    }

    /// Identifier of the record in flight.
    #[must_use]
    pub fn open_id(&self) -> Option<&str> {
        self.open_id.as_deref()
    }

    fn require_open(&self, what: &'static str) -> Result<&str> {
        self.open_id.as_deref().ok_or(SiftError::NoOpenRecord(what))
    }
}
