//! Full session cycles with fake backend collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deckhand_core::document::TextProps;
use deckhand_core::instruction::{InstructionResponse, InstructionStatus};
use deckhand_core::publish::{
    DocumentFileSource, DocumentUpload, DocumentUploader, SnapshotPayload, TransportResult,
};
use deckhand_core::{
    CodeInput, Collaborators, Deck, DeckhandConfig, Geometry, InstructionRequest,
    InstructionSource, MemoryDocument, ScriptRuntime, Session, ShapeKind, ShapeModel, SlideModel,
    SnapshotTransport, TransportError,
};
use serde_json::{json, Value};

/// Fails the first `failures` calls, then succeeds.
struct FlakySnapshots {
    failures: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

impl FlakySnapshots {
    fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            received: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SnapshotTransport for FlakySnapshots {
    async fn send_snapshot(&self, payload: &SnapshotPayload<'_>) -> TransportResult<Value> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Http("connection reset".into()));
        }
        self.received
            .lock()
            .unwrap()
            .push(serde_json::to_value(payload).unwrap());
        Ok(json!({"status": "success"}))
    }
}

struct Bytes(Vec<u8>);

#[async_trait]
impl DocumentFileSource for Bytes {
    async fn slice_count(&self) -> std::io::Result<usize> {
        Ok(self.0.chunks(4).count())
    }

    async fn slice(&self, index: usize) -> std::io::Result<Vec<u8>> {
        Ok(self.0.chunks(4).nth(index).unwrap_or_default().to_vec())
    }
}

#[derive(Default)]
struct Uploads {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl DocumentUploader for Uploads {
    async fn upload_document(&self, _upload: &DocumentUpload) -> TransportResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TransportError::Status {
                status: 413,
                body: "too large".into(),
            });
        }
        Ok(json!({"status": "success"}))
    }
}

/// Replays canned responses and records requests.
struct Scripted {
    responses: Mutex<VecDeque<InstructionResponse>>,
    requests: Mutex<Vec<InstructionRequest>>,
}

impl Scripted {
    fn new(responses: Vec<InstructionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InstructionSource for Scripted {
    async fn request_code(&self, request: &InstructionRequest) -> TransportResult<InstructionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Http("no more responses".into()))
    }
}

fn deck() -> Deck {
    let title = |i: usize| {
        ShapeModel::new("title", ShapeKind::TextBox, Geometry::new(0.0, 0.0, 100.0, 20.0)).with_text(
            TextProps {
                text: format!("Slide {i}"),
                ..TextProps::default()
            },
        )
    };
    Deck {
        slides: vec![
            SlideModel::new("s0", vec![title(0)]),
            SlideModel::new("s1", vec![title(1)]).selected(),
        ],
    }
}

fn success(code: CodeInput) -> InstructionResponse {
    InstructionResponse {
        status: InstructionStatus::Success,
        message: Some("ok".into()),
        generated_code: Some(code),
        code: None,
    }
}

struct Harness {
    host: Arc<MemoryDocument>,
    snapshots: Arc<FlakySnapshots>,
    uploads: Arc<Uploads>,
    instructions: Arc<Scripted>,
}

impl Harness {
    fn new(snapshot_failures: usize, uploads: Uploads, responses: Vec<InstructionResponse>) -> Self {
        Self {
            host: Arc::new(MemoryDocument::new(deck())),
            snapshots: Arc::new(FlakySnapshots::new(snapshot_failures)),
            uploads: Arc::new(uploads),
            instructions: Arc::new(Scripted::new(responses)),
        }
    }

    fn session(&self, config: DeckhandConfig) -> Session {
        let collaborators = Collaborators {
            snapshots: self.snapshots.clone(),
            uploader: self.uploads.clone(),
            file: Arc::new(Bytes(b"PK\x03\x04 fake pptx".to_vec())),
            instructions: self.instructions.clone(),
        };
        Session::new(
            self.host.clone(),
            collaborators,
            Arc::new(ScriptRuntime::new()),
            config,
        )
    }
}

#[tokio::test]
async fn full_cycle_applies_returned_code() {
    let harness = Harness::new(
        0,
        Uploads::default(),
        vec![success(CodeInput::from(
            "```\nshape title text = \"Agenda\", bold = true\n```",
        ))],
    );
    let report = harness
        .session(DeckhandConfig::default())
        .run("rename the title")
        .await;

    assert!(report.succeeded(), "{report:?}");
    assert!(report.snapshot.succeeded);
    assert_eq!(report.snapshot.attempts, 1);
    assert_eq!(report.records, 2);
    assert!(report.upload.succeeded);
    assert_eq!(report.selection.current_index, Some(1));
    assert_eq!(report.selection.total_slides, 2);
    assert_eq!(report.message.as_deref(), Some("ok"));

    let requests = harness.instructions.requests.lock().unwrap();
    assert_eq!(requests[0].instruction, "rename the title");
    assert_eq!(requests[0].slide_index, Some(1));

    let snapshot = &harness.snapshots.received.lock().unwrap()[0];
    assert_eq!(snapshot["filename"], "metadata.json");
    assert_eq!(snapshot["data"].as_array().unwrap().len(), 2);

    // A single fragment targets unit 0.
    let deck = harness.host.deck();
    assert_eq!(deck.slides[0].shapes[0].text.as_ref().unwrap().text, "Agenda");
}

#[tokio::test]
async fn failed_publish_is_retried_once() {
    let harness = Harness::new(
        1,
        Uploads::default(),
        vec![success(CodeInput::from("shape title left = 3"))],
    );
    let report = harness
        .session(DeckhandConfig::default())
        .run("nudge")
        .await;
    assert!(report.snapshot.succeeded);
    assert_eq!(report.snapshot.attempts, 2);
    assert!(report.succeeded());
}

#[tokio::test]
async fn exhausted_retries_skip_the_instruction() {
    let harness = Harness::new(
        5,
        Uploads::default(),
        vec![success(CodeInput::from("shape title left = 3"))],
    );
    let report = harness
        .session(DeckhandConfig::default())
        .run("nudge")
        .await;

    assert!(!report.snapshot.succeeded);
    assert_eq!(report.snapshot.attempts, 2);
    assert!(report
        .snapshot
        .error
        .as_deref()
        .unwrap()
        .contains("connection reset"));
    assert!(!report.instruction.succeeded);
    assert!(report.dispatch.is_none());
    assert!(harness.instructions.requests.lock().unwrap().is_empty());
    assert!(!report.succeeded());
}

#[tokio::test]
async fn upload_failure_is_reported_after_retries() {
    let harness = Harness::new(
        0,
        Uploads {
            fail: true,
            ..Uploads::default()
        },
        vec![],
    );
    let config = DeckhandConfig {
        retry_attempts: 2,
        ..DeckhandConfig::default()
    };
    let report = harness.session(config).run("anything").await;

    assert!(report.snapshot.succeeded);
    assert!(!report.upload.succeeded);
    assert_eq!(report.upload.attempts, 3);
    assert_eq!(harness.uploads.calls.load(Ordering::SeqCst), 3);
    assert!(report.upload.error.as_deref().unwrap().contains("413"));
    assert!(report.dispatch.is_none());
}

#[tokio::test]
async fn error_status_means_nothing_is_dispatched() {
    let harness = Harness::new(
        0,
        Uploads::default(),
        vec![InstructionResponse {
            status: InstructionStatus::Error,
            message: Some("could not understand".into()),
            generated_code: Some(CodeInput::from("shape title left = 3")),
            code: None,
        }],
    );
    let report = harness
        .session(DeckhandConfig::default())
        .run("???")
        .await;

    assert!(!report.instruction.succeeded);
    assert!(report
        .instruction
        .error
        .as_deref()
        .unwrap()
        .contains("could not understand"));
    assert!(report.dispatch.is_none());
    assert_eq!(harness.host.deck().slides[0].shapes[0].left, 0.0);
}

#[tokio::test]
async fn per_slide_mode_publishes_each_slide() {
    let harness = Harness::new(
        0,
        Uploads::default(),
        vec![success(CodeInput::from("shape title top = 9"))],
    );
    let config = DeckhandConfig {
        per_slide: true,
        ..DeckhandConfig::default()
    };
    let report = harness.session(config).run("go").await;

    let names: Vec<_> = report.publish.iter().map(|o| o.destination.as_str()).collect();
    assert_eq!(names, vec!["slide_0_metadata.json", "slide_1_metadata.json"]);
    assert!(report.succeeded());
}

#[tokio::test]
async fn partial_dispatch_failure_is_reported() {
    let mut per_unit = std::collections::BTreeMap::new();
    per_unit.insert(0, Some("shape title left = 4".to_string()));
    per_unit.insert(1, None);
    let harness = Harness::new(
        0,
        Uploads::default(),
        vec![success(CodeInput::PerUnit(per_unit))],
    );
    let report = harness
        .session(DeckhandConfig::default())
        .run("go")
        .await;

    let dispatch = report.dispatch.as_ref().unwrap();
    assert!(!dispatch.overall_succeeded);
    assert!(dispatch.outcomes[0].succeeded);
    assert!(!dispatch.outcomes[1].succeeded);
    assert!(!report.succeeded());
    assert_eq!(harness.host.deck().slides[0].shapes[0].left, 4.0);
}
