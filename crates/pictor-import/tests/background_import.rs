use std::thread;
use std::time::Duration;

use pictor_engine::{Color, SharedDocument};
use pictor_import::{BytesSource, ImportError, ImportSource, ImportWarning, Importer};

const TWO_RECTS: &str = r#"{ "version": "1", "document": {
    "entry_scene_id": "main",
    "scenes": { "main": { "children": ["a", "b"], "backgroundColor": { "r": 240, "g": 240, "b": 240 } } },
    "nodes": {
        "a": { "type": "rectangle", "left": 0, "top": 0, "width": 10, "height": 10,
               "fill": { "type": "solid", "color": { "r": 255, "g": 0, "b": 0, "a": 1 } } },
        "b": { "type": "rectangle", "left": 5, "top": 5, "width": 10, "height": 10,
               "fill": { "type": "radial_gradient",
                         "stops": [{ "offset": 0, "color": { "r": 0, "g": 0, "b": 0, "a": 1 } }] } }
    } } }"#;

/// Payload source that takes a while to answer.
struct SlowSource {
    key: &'static str,
    delay: Duration,
    payload: String,
}

impl ImportSource for SlowSource {
    fn key(&self) -> String {
        self.key.to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, ImportError> {
        thread::sleep(self.delay);
        Ok(self.payload.clone().into_bytes())
    }
}

fn one_rect(id: &str) -> String {
    format!(
        r#"{{ "document": {{ "nodes": {{ "{id}": {{ "type": "rectangle", "width": 1, "height": 1 }} }} }} }}"#
    )
}

#[tokio::test]
async fn import_applies_as_one_transaction() {
    let doc = SharedDocument::default();
    let importer = Importer::new(doc.clone());

    let report = importer.spawn(BytesSource::new("mem", TWO_RECTS)).wait().await.unwrap();

    assert_eq!(report.created.len(), 2);
    assert_eq!(report.revision, 1);
    assert!(matches!(report.warnings[..], [ImportWarning::DroppedPaint { .. }]));
    assert_eq!(report.background, Some(Color::rgb(240, 240, 240)));
    let sources: Vec<&str> = report.ids.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(sources, ["a", "b"]);
    let read = doc.read();
    assert_eq!(read.order(), &report.created[..]);
    assert!(read.paints(report.created[1], pictor_engine::PaintTarget::Fill).unwrap().is_empty());
}

#[tokio::test]
async fn parse_failure_leaves_document_untouched() {
    let doc = SharedDocument::default();
    let importer = Importer::new(doc.clone());

    let err = importer
        .spawn(BytesSource::new("mem", "{ not json"))
        .wait()
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Parse(_)));
    assert_eq!(doc.revision(), 0);
    assert!(doc.read().is_empty());
}

#[tokio::test]
async fn cancel_before_apply_discards_the_batch() {
    let doc = SharedDocument::default();
    let importer = Importer::new(doc.clone());

    let handle = importer.spawn(SlowSource {
        key: "slow",
        delay: Duration::from_millis(200),
        payload: TWO_RECTS.to_string(),
    });
    handle.cancel();

    assert!(matches!(handle.wait().await, Err(ImportError::Cancelled)));
    assert_eq!(doc.revision(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn same_source_applies_in_spawn_order() {
    let doc = SharedDocument::default();
    let importer = Importer::new(doc.clone());

    // The first import fetches slower than the second but must still land first.
    let first = importer.spawn(SlowSource {
        key: "feed",
        delay: Duration::from_millis(300),
        payload: one_rect("first"),
    });
    let second = importer.spawn(SlowSource {
        key: "feed",
        delay: Duration::from_millis(10),
        payload: one_rect("second"),
    });

    let second = second.wait().await.unwrap();
    let first = first.wait().await.unwrap();

    assert!(first.revision < second.revision);
    assert_eq!(doc.read().order(), &[first.created[0], second.created[0]]);
}
