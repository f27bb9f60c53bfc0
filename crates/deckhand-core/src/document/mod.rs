//! Batched access to a live slide document.
//!
//! - [`host`]   : `DocumentHost` trait, `Request` / `Reply`
//! - [`context`]: `DocumentContext` request queue, `Pending<T>` handles
//! - [`model`]  : shape/text value types and `ShapeEdit`
//! - [`memory`] : `MemoryDocument`, an in-process host over a JSON deck
//! - [`error`]  : `HostError` / `HostResult`

pub mod context;
pub mod error;
pub mod host;
pub mod memory;
pub mod model;

pub use context::{DocumentContext, FromReply, Pending};
pub use error::{HostError, HostResult};
pub use host::{DocumentHost, Reply, Request};
pub use memory::{Deck, MemoryDocument, ShapeModel, SlideModel};
pub use model::{
    FontInfo, ShapeCollection, ShapeEdit, ShapeKind, ShapeProps, ShapeRef, SlideInfo, TextAlign,
    TextProps,
};
