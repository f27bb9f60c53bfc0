//! Deckhand Core Library
//!
//! Shape metadata extraction, overlap analysis and sandboxed fragment
//! dispatch for slide documents reached through a batched remote object graph.

pub mod active_slide;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod http;
pub mod instruction;
pub mod metrics;
pub mod obs;
pub mod overlap;
pub mod publish;
pub mod script;
pub mod session;
pub mod telemetry;

pub use active_slide::{active_slide, SlideSelection};
pub use config::{ConfigError, DeckhandConfig};
pub use dispatch::{
    CapabilityPolicy, DispatchConfig, DispatchError, DispatchResult, Dispatcher,
    DocumentCapability, ExecutionOutcome, FragmentRuntime, UnitScope,
};
pub use document::{
    Deck, DocumentContext, DocumentHost, HostError, HostResult, MemoryDocument, ShapeKind,
    ShapeModel, SlideModel,
};
pub use error::{DeckError, Result};
pub use extract::{extract_shapes, extract_snapshot, ExtractionReport, ShapeRecord};
pub use geometry::{overlaps, Bounds, Geometry};
pub use http::HttpBackend;
pub use instruction::{CodeInput, CodeUnit, InstructionRequest, InstructionResponse, InstructionSource};
pub use overlap::annotate_overlaps;
pub use publish::{
    publish_per_slide, publish_snapshot, FsDocumentFile, PublishOutcome, SnapshotDestination,
    SnapshotTransport, TransportError,
};
pub use script::ScriptRuntime;
pub use session::{Collaborators, Session, SessionReport, StepReport};

/// Crate version, re-exported for the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
