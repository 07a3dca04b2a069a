//! Progress logging for long record streams.
//!
//! [`BatchLogger`] is a pass-through stage: every event goes downstream
//! unchanged, and every `batch_size` records an `info` event is logged with the
//! running totals. A final summary is logged when the stream closes.

use tracing::info;

use crate::error::Result;
use crate::event::StreamReceiver;

/// Default number of records between two progress messages.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Pass-through stage counting and periodically logging records.
#[derive(Debug)]
pub struct BatchLogger<R> {
    batch_size: usize,
    records: usize,
    entities: usize,
    literals: usize,
    receiver: R,
}

impl<R: StreamReceiver> BatchLogger<R> {
    /// Creates a logger reporting every [`DEFAULT_BATCH_SIZE`] records.
    pub fn new(receiver: R) -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE, receiver)
    }

    /// Creates a logger reporting every `batch_size` records (at least one).
    pub fn with_batch_size(batch_size: usize, receiver: R) -> Self {
        Self {
            batch_size: batch_size.max(1),
            records: 0,
            entities: 0,
            literals: 0,
            receiver,
        }
    }

    /// Records completed so far.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Entities seen so far.
    #[must_use]
    pub fn entities(&self) -> usize {
        self.entities
    }

    /// Literals seen so far.
    #[must_use]
    pub fn literals(&self) -> usize {
        self.literals
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

    /// Consumes the logger and returns the downstream stage.
    pub fn into_receiver(self) -> R {
        self.receiver
    }
}

impl<R: StreamReceiver> StreamReceiver for BatchLogger<R> {
    fn start_record(&mut self, id: &str) -> Result<()> {
        self.receiver.start_record(id)
    }

    fn end_record(&mut self) -> Result<()> {
        self.receiver.end_record()?;
        self.records += 1;
        if self.records % self.batch_size == 0 {
            info!(
                records = self.records,
                entities = self.entities,
                literals = self.literals,
                "records processed"
            );
        }
        Ok(())
    }

    fn start_entity(&mut self, name: &str) -> Result<()> {
        self.entities += 1;
        self.receiver.start_entity(name)
    }

    fn end_entity(&mut self) -> Result<()> {
        self.receiver.end_entity()
    }

    fn literal(&mut self, name: &str, value: &str) -> Result<()> {
        self.literals += 1;
        self.receiver.literal(name, value)
    }

    fn reset_stream(&mut self) -> Result<()> {
        self.receiver.reset_stream()
    }

    fn close_stream(&mut self) -> Result<()> {
        info!(
            records = self.records,
            entities = self.entities,
            literals = self.literals,
            "stream closed"
        );
        self.receiver.close_stream()
    }
}
