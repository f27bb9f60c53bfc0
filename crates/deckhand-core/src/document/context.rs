//! Request queue with explicit synchronization points.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use super::error::{HostError, HostResult};
use super::host::{DocumentHost, Reply, Request};
use super::model::{ShapeCollection, ShapeEdit, ShapeProps, ShapeRef, SlideInfo, TextProps};
use crate::metrics::METRICS;

/// Handle to the not-yet-materialized result of a queued request.
///
/// Redeem it with [`DocumentContext::take`] after the next [`DocumentContext::sync`].
#[must_use = "a pending value is only useful once taken after sync"]
#[derive(Debug)]
pub struct Pending<T> {
    slot: usize,
    _value: PhantomData<fn() -> T>,
}

/// Conversion from a raw [`Reply`] into the value a [`Pending`] promises.
pub trait FromReply: Sized {
    fn from_reply(reply: Reply) -> HostResult<Self>;
}

impl FromReply for Vec<SlideInfo> {
    fn from_reply(reply: Reply) -> HostResult<Self> {
        match reply {
            Reply::Slides(slides) => Ok(slides),
            _ => Err(HostError::UnexpectedReply { expected: "slides" }),
        }
    }
}

impl FromReply for Vec<HostResult<ShapeProps>> {
    fn from_reply(reply: Reply) -> HostResult<Self> {
        match reply {
            Reply::Shapes(shapes) => Ok(shapes),
            _ => Err(HostError::UnexpectedReply { expected: "shapes" }),
        }
    }
}

impl FromReply for Option<TextProps> {
    fn from_reply(reply: Reply) -> HostResult<Self> {
        match reply {
            Reply::Text(text) => Ok(text),
            _ => Err(HostError::UnexpectedReply { expected: "text" }),
        }
    }
}

impl FromReply for ShapeProps {
    fn from_reply(reply: Reply) -> HostResult<Self> {
        match reply {
            Reply::Shape(props) => Ok(props),
            _ => Err(HostError::UnexpectedReply { expected: "shape" }),
        }
    }
}

impl FromReply for () {
    fn from_reply(reply: Reply) -> HostResult<Self> {
        match reply {
            Reply::Done => Ok(()),
            _ => Err(HostError::UnexpectedReply { expected: "done" }),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Queued,
    Ready(HostResult<Reply>),
    Taken,
}

/// Scoped access to a document: queue requests, then `sync` to run them.
///
/// Requests queued since the last `sync` are discarded if the context is
/// dropped, so a failed unit of work leaves no half-sent batch behind.
pub struct DocumentContext {
    host: Arc<dyn DocumentHost>,
    queued: Vec<Request>,
    slots: Vec<Slot>,
    sync_count: usize,
}

impl DocumentContext {
    pub fn new(host: Arc<dyn DocumentHost>) -> Self {
        Self {
            host,
            queued: Vec::new(),
            slots: Vec::new(),
            sync_count: 0,
        }
    }

    pub fn load_slides(&mut self) -> Pending<Vec<SlideInfo>> {
        self.enqueue(Request::LoadSlides)
    }

    pub fn selected_slides(&mut self) -> Pending<Vec<SlideInfo>> {
        self.enqueue(Request::SelectedSlides)
    }

    pub fn load_shapes(&mut self, collection: ShapeCollection) -> Pending<Vec<HostResult<ShapeProps>>> {
        self.enqueue(Request::LoadShapes(collection))
    }

    pub fn load_text(&mut self, shape: ShapeRef) -> Pending<Option<TextProps>> {
        self.enqueue(Request::LoadText(shape))
    }

    pub fn read_shape(&mut self, shape: ShapeRef) -> Pending<ShapeProps> {
        self.enqueue(Request::ReadShape(shape))
    }

    pub fn edit(&mut self, shape: ShapeRef, edit: ShapeEdit) -> Pending<()> {
        self.enqueue(Request::Edit { shape, edit })
    }

    pub fn delete(&mut self, shape: ShapeRef) -> Pending<()> {
        self.enqueue(Request::Delete(shape))
    }

    fn enqueue<T>(&mut self, request: Request) -> Pending<T> {
        self.queued.push(request);
        self.slots.push(Slot::Queued);
        Pending {
            slot: self.slots.len() - 1,
            _value: PhantomData,
        }
    }

    /// Run every queued request in one round trip.
    ///
    /// An empty queue costs nothing. If the host rejects the whole batch, every
    /// pending value from it resolves to the same error, which is also returned.
    pub async fn sync(&mut self) -> HostResult<()> {
        if self.queued.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(&mut self.queued);
        let count = batch.len();
        let first = self.slots.len() - count;
        self.sync_count += 1;
        METRICS.inc_syncs();
        debug!(requests = count, sync = self.sync_count, "synchronizing document batch");

        let outcome = match self.host.execute(batch).await {
            Ok(replies) if replies.len() == count => Ok(replies),
            Ok(replies) => Err(HostError::SyncFailed(format!(
                "host returned {} replies for {} requests",
                replies.len(),
                count
            ))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(replies) => {
                for (slot, reply) in self.slots[first..].iter_mut().zip(replies) {
                    *slot = Slot::Ready(reply);
                }
                Ok(())
            }
            Err(e) => {
                for slot in &mut self.slots[first..] {
                    *slot = Slot::Ready(Err(e.clone()));
                }
                Err(e)
            }
        }
    }

    /// Redeem a pending value. Fails with [`HostError::NotSynced`] before its sync.
    pub fn take<T: FromReply>(&mut self, pending: Pending<T>) -> HostResult<T> {
        let Some(slot) = self.slots.get_mut(pending.slot) else {
            return Err(HostError::NotSynced);
        };
        match std::mem::replace(slot, Slot::Taken) {
            Slot::Ready(reply) => reply.and_then(T::from_reply),
            Slot::Queued => {
                *slot = Slot::Queued;
                Err(HostError::NotSynced)
            }
            Slot::Taken => Err(HostError::NotSynced),
        }
    }

    /// Drop everything queued since the last sync. Returns how many requests were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.queued.len();
        self.queued.clear();
        let keep = self.slots.len() - dropped;
        self.slots.truncate(keep);
        dropped
    }

    /// Requests queued but not yet synchronized.
    pub fn pending_requests(&self) -> usize {
        self.queued.len()
    }

    /// Round trips performed so far.
    pub fn sync_count(&self) -> usize {
        self.sync_count
    }
}

impl std::fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContext")
            .field("queued", &self.queued.len())
            .field("sync_count", &self.sync_count)
            .finish()
    }
}
