use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pictor_engine::{Color, NodeId, SharedDocument};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::convert::{convert, ImportBatch, ImportWarning};
use crate::error::ImportError;
use crate::schema::SourceFile;
use crate::source::ImportSource;

/// Outcome of an applied import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub created: Vec<NodeId>,
    /// Source id -> engine id of every created node.
    pub ids: Vec<(String, NodeId)>,
    pub warnings: Vec<ImportWarning>,
    /// Background declared by the imported scene.
    pub background: Option<Color>,
    /// Document revision after the batch.
    pub revision: u64,
}

/// Fetches, parses and converts a payload without touching any document.
pub fn prepare(source: &dyn ImportSource) -> Result<ImportBatch, ImportError> {
    let bytes = source.fetch()?;
    let file = SourceFile::parse(&bytes)?;
    Ok(convert(&file))
}

/// Applies a batch as one transaction unless `cancelled` is set when its turn comes.
fn apply(doc: &SharedDocument, batch: ImportBatch, cancelled: &AtomicBool) -> Result<ImportReport, ImportError> {
    let outcome = doc.submit_batch_if(&batch.mutations, || !cancelled.load(Ordering::Acquire));
    let report = outcome.ok_or(ImportError::Cancelled)??;
    log::info!(
        "imported {} nodes at r{} ({} warnings)",
        report.created.len(),
        report.revision,
        batch.warnings.len()
    );
    Ok(ImportReport {
        created: report.created,
        ids: batch.ids,
        warnings: batch.warnings,
        background: batch.background,
        revision: report.revision,
    })
}

/// Runs an import on the calling thread.
pub fn import_blocking(doc: &SharedDocument, source: &dyn ImportSource) -> Result<ImportReport, ImportError> {
    let batch = prepare(source)?;
    apply(doc, batch, &AtomicBool::new(false))
}

/// Background importer bound to one document.
///
/// Fetching and conversion run concurrently; batches from the same source
/// key are applied in spawn order, batches from different keys in whatever
/// order they become ready.
#[derive(Clone)]
pub struct Importer {
    doc: SharedDocument,
    /// Per source key: completion signal of the most recently spawned import.
    tails: Arc<Mutex<HashMap<String, oneshot::Receiver<()>>>>,
}

/// A running import.
pub struct ImportHandle {
    cancelled: Arc<AtomicBool>,
    join: JoinHandle<Result<ImportReport, ImportError>>,
}

impl ImportHandle {
    /// Requests cancellation. Has no effect once the batch has started applying.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn wait(self) -> Result<ImportReport, ImportError> {
        self.join.await?
    }
}

impl Importer {
    pub fn new(doc: SharedDocument) -> Self {
        Self {
            doc,
            tails: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts importing `source`. Must be called within a tokio runtime.
    pub fn spawn<S: ImportSource>(&self, source: S) -> ImportHandle {
        let key = source.key();
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let previous = self.tails.lock().insert(key.clone(), done_rx);

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let doc = self.doc.clone();

        let join = tokio::spawn(async move {
            // Dropped when this task ends, releasing the next import of the same key.
            let _done = done_tx;
            log::debug!("import from {key} started");

            let batch = tokio::task::spawn_blocking(move || prepare(&source)).await??;

            if let Some(previous) = previous {
                // Either outcome means the previous import has finished.
                let _ = previous.await;
            }
            if flag.load(Ordering::Acquire) {
                log::info!("import from {key} cancelled");
                return Err(ImportError::Cancelled);
            }

            let result = tokio::task::spawn_blocking(move || apply(&doc, batch, &flag)).await?;
            if let Err(err) = &result {
                log::warn!("import from {key} failed: {err}");
            }
            result
        });

        ImportHandle { cancelled, join }
    }
}
