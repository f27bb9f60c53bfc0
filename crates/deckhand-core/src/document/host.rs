//! The document host contract.
//!
//! A host owns the live document. Every read or write is expressed as a
//! [`Request`] and nothing is materialized until a batch of requests is
//! executed in a single round trip. Callers should not talk to a host
//! directly; queue work through [`super::DocumentContext`] instead.

use async_trait::async_trait;

use super::error::HostResult;
use super::model::{ShapeCollection, ShapeEdit, ShapeProps, ShapeRef, SlideInfo, TextProps};

/// One queued operation against the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// The ordered slide collection.
    LoadSlides,
    /// Slides currently selected in the host UI.
    SelectedSlides,
    /// Enumerate a collection and read identity/geometry of every item.
    LoadShapes(ShapeCollection),
    /// Text, font and alignment of a shape's text container, if it has one.
    LoadText(ShapeRef),
    /// Identity/geometry of a single shape, searched through groups.
    ReadShape(ShapeRef),
    Edit { shape: ShapeRef, edit: ShapeEdit },
    Delete(ShapeRef),
}

impl Request {
    /// Whether executing this request changes the document.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Request::Edit { .. } | Request::Delete(_))
    }
}

/// Materialized result of one [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Slides(Vec<SlideInfo>),
    /// One entry per collection item; an unreadable item does not fail its siblings.
    Shapes(Vec<HostResult<ShapeProps>>),
    Text(Option<TextProps>),
    Shape(ShapeProps),
    Done,
}

/// A live document reachable only through batched round trips.
///
/// Guarantees:
/// - One `execute` call is one synchronization point.
/// - On `Ok`, the returned vector has exactly one entry per request, in order.
/// - `Err` means the whole batch failed to synchronize; no mutation in it took effect.
#[async_trait]
pub trait DocumentHost: Send + Sync {
    async fn execute(&self, batch: Vec<Request>) -> HostResult<Vec<HostResult<Reply>>>;
}
