use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use kurbo::Rect;
use parking_lot::{Condvar, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::EngineError;

use super::dirty::DirtySet;
use super::mutation::{BatchReport, Mutation};
use super::snapshot::{DocumentSnapshot, FrameSnapshot};
use super::Document;

/// Thread-safe handle to a Document.
///
/// Readers share the lock for the duration of a query. Writers first take a
/// ticket from a FIFO gate, so transactions from the UI, the render loop and
/// import tasks are applied strictly in arrival order and never interleave.
#[derive(Clone, Default)]
pub struct SharedDocument {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    doc: RwLock<Document>,
    gate: Mutex<Gate>,
    turn: Condvar,
}

#[derive(Default)]
struct Gate {
    next_ticket: u64,
    serving: u64,
}

/// Exclusive access to the Document for one transaction.
///
/// Dropping it hands the turn to the next queued writer.
pub struct WriteTurn<'a> {
    guard: RwLockWriteGuard<'a, Document>,
    shared: &'a Shared,
}

impl Deref for WriteTurn<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.guard
    }
}

impl DerefMut for WriteTurn<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.guard
    }
}

impl Drop for WriteTurn<'_> {
    fn drop(&mut self) {
        let mut gate = self.shared.gate.lock();
        gate.serving += 1;
        self.shared.turn.notify_all();
    }
}

impl SharedDocument {
    pub fn new(doc: Document) -> Self {
        Self {
            inner: Arc::new(Shared {
                doc: RwLock::new(doc),
                gate: Mutex::new(Gate::default()),
                turn: Condvar::new(),
            }),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.inner.doc.read()
    }

    /// Waits for this caller's turn in the FIFO gate, then locks for writing.
    pub fn write(&self) -> WriteTurn<'_> {
        {
            let mut gate = self.inner.gate.lock();
            let ticket = gate.next_ticket;
            gate.next_ticket += 1;
            while gate.serving != ticket {
                self.inner.turn.wait(&mut gate);
            }
        }
        WriteTurn {
            guard: self.inner.doc.write(),
            shared: &self.inner,
        }
    }

    pub fn submit_batch(&self, batch: &[Mutation]) -> Result<BatchReport, EngineError> {
        self.write().apply_batch(batch)
    }

    /// Like [`submit_batch`](Self::submit_batch), but evaluates `proceed` once the
    /// turn is acquired. Returns `None` without touching the Document when it
    /// says no; once it says yes the batch runs to completion.
    pub fn submit_batch_if(
        &self,
        batch: &[Mutation],
        proceed: impl FnOnce() -> bool,
    ) -> Option<Result<BatchReport, EngineError>> {
        let mut turn = self.write();
        if !proceed() {
            return None;
        }
        Some(turn.apply_batch(batch))
    }

    pub fn begin_frame(&self, region: Rect) -> FrameSnapshot {
        self.write().begin_frame(region)
    }

    pub fn requeue(&self, pending: DirtySet) {
        self.write().requeue(pending);
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.read().snapshot()
    }

    pub fn revision(&self) -> u64 {
        self.read().revision()
    }
}

impl From<Document> for SharedDocument {
    fn from(doc: Document) -> Self {
        Self::new(doc)
    }
}

impl std::fmt::Debug for SharedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDocument")
            .field("revision", &self.revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NodeSpec, NodeUpdate};
    use crate::geometry::{Geometry, Transform};

    #[test]
    fn declined_batch_leaves_document_untouched() {
        let doc = SharedDocument::default();
        let batch = [Mutation::CreateNode(NodeSpec::new(Geometry::rect(1.0, 1.0)))];
        assert!(doc.submit_batch_if(&batch, || false).is_none());
        assert!(doc.read().is_empty());
        let report = doc.submit_batch_if(&batch, || true).unwrap().unwrap();
        assert_eq!(report.created.len(), 1);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let doc = SharedDocument::default();
        let id = doc
            .write()
            .create_node(NodeSpec::new(Geometry::rect(10.0, 10.0)))
            .unwrap();
        let before = doc.snapshot();
        doc.write()
            .update_node(id, NodeUpdate::transform(Transform::translate(50.0, 0.0)))
            .unwrap();
        assert_eq!(before.nodes[0].bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(doc.snapshot().nodes[0].bounds, Rect::new(50.0, 0.0, 60.0, 10.0));
    }

    #[test]
    fn turns_are_released_on_drop() {
        let doc = SharedDocument::default();
        for _ in 0..3 {
            let _turn = doc.write();
        }
        let frame = doc.begin_frame(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(frame.visible.is_empty());
    }
}
