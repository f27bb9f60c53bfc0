//! The boundary between the dispatcher and whatever interprets fragments.

use async_trait::async_trait;

use super::capability::DocumentCapability;
use super::error::DispatchError;
use super::policy::CapabilityPolicy;
use crate::document::DocumentContext;

/// What a fragment is allowed to reach while it runs.
#[derive(Debug, Clone, Copy)]
pub struct UnitScope<'a> {
    pub unit_key: u32,
    /// The slide this unit addresses. Unit keys are slide indices.
    pub slide_index: usize,
    pub policy: &'a CapabilityPolicy,
}

impl<'a> UnitScope<'a> {
    pub fn new(unit_key: u32, policy: &'a CapabilityPolicy) -> Self {
        Self {
            unit_key,
            slide_index: unit_key as usize,
            policy,
        }
    }

    pub fn authorize(&self, capability: DocumentCapability) -> Result<(), DispatchError> {
        self.policy.check(capability)
    }

    /// Resolve the slide a statement targets, defaulting to the unit's own.
    ///
    /// Naming another slide needs [`DocumentCapability::CrossSlide`].
    pub fn resolve_slide(&self, requested: Option<usize>) -> Result<usize, DispatchError> {
        match requested {
            Some(slide) if slide != self.slide_index => {
                self.authorize(DocumentCapability::CrossSlide)?;
                Ok(slide)
            }
            _ => Ok(self.slide_index),
        }
    }
}

/// Interprets one normalized fragment against a scoped document context.
///
/// Implementations queue requests on `doc` and may `sync` as often as they
/// need. Whatever is still queued when `run` returns `Ok` is committed by the
/// dispatcher; on `Err` it is discarded.
#[async_trait]
pub trait FragmentRuntime: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn run(
        &self,
        scope: &UnitScope<'_>,
        body: &str,
        doc: &mut DocumentContext,
    ) -> Result<(), DispatchError>;
}
