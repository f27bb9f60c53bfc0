//! Locating the slide the user is working on.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{DocumentContext, DocumentHost, HostResult};

/// Position of the selected slide within the deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideSelection {
    /// `None` when nothing is selected or the selection is not in the deck.
    pub current_index: Option<usize>,
    pub total_slides: usize,
}

/// Find the first selected slide's index in one round trip.
///
/// Host failures degrade to an empty selection over zero slides.
pub async fn active_slide(host: Arc<dyn DocumentHost>) -> SlideSelection {
    match locate(host).await {
        Ok(selection) => selection,
        Err(e) => {
            warn!(event = "active_slide.failed", error = %e);
            SlideSelection::default()
        }
    }
}

async fn locate(host: Arc<dyn DocumentHost>) -> HostResult<SlideSelection> {
    let mut ctx = DocumentContext::new(host);
    let slides = ctx.load_slides();
    let selected = ctx.selected_slides();
    ctx.sync().await?;
    let slides = ctx.take(slides)?;
    let selected = ctx.take(selected)?;

    let current_index = selected
        .first()
        .and_then(|active| slides.iter().position(|s| s.id == active.id));
    if current_index.is_none() {
        debug!(selected = selected.len(), "no active slide in the slide collection");
    }

    Ok(SlideSelection {
        current_index,
        total_slides: slides.len(),
    })
}
