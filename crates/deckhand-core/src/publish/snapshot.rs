//! Handing extracted records to the snapshot transport.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::TransportResult;
use crate::extract::ShapeRecord;
use crate::obs;

/// Wire payload for one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotPayload<'a> {
    pub filename: &'a str,
    pub path: &'a str,
    pub data: &'a [ShapeRecord],
}

/// Where a snapshot lands on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotDestination {
    pub name: String,
    pub path: String,
}

impl Default for SnapshotDestination {
    fn default() -> Self {
        Self {
            name: "metadata.json".to_string(),
            path: "slide_images".to_string(),
        }
    }
}

impl SnapshotDestination {
    /// Destination for one slide in per-slide mode: `slide_<n>_<name>`.
    pub fn for_slide(&self, slide_index: usize) -> Self {
        Self {
            name: format!("slide_{slide_index}_{}", self.name),
            path: self.path.clone(),
        }
    }
}

/// Accepts snapshots for storage by the backend.
#[async_trait]
pub trait SnapshotTransport: Send + Sync {
    async fn send_snapshot(&self, payload: &SnapshotPayload<'_>) -> TransportResult<serde_json::Value>;
}

/// Result of one publish attempt. Failure is data, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub destination: String,
    pub record_count: usize,
    pub succeeded: bool,
    pub error: Option<String>,
    pub response: Option<serde_json::Value>,
}

/// Publish all records as one snapshot.
pub async fn publish_snapshot(
    transport: &dyn SnapshotTransport,
    destination: &SnapshotDestination,
    records: &[ShapeRecord],
) -> PublishOutcome {
    let payload = SnapshotPayload {
        filename: &destination.name,
        path: &destination.path,
        data: records,
    };
    let outcome = match transport.send_snapshot(&payload).await {
        Ok(response) => PublishOutcome {
            destination: destination.name.clone(),
            record_count: records.len(),
            succeeded: true,
            error: None,
            response: Some(response),
        },
        Err(e) => PublishOutcome {
            destination: destination.name.clone(),
            record_count: records.len(),
            succeeded: false,
            error: Some(e.to_string()),
            response: None,
        },
    };
    obs::emit_snapshot_published(&outcome.destination, outcome.record_count, outcome.succeeded);
    outcome
}

/// Publish one snapshot per slide, in slide order.
///
/// Slides without records are not published. A failed slide does not stop
/// the remaining ones.
pub async fn publish_per_slide(
    transport: &dyn SnapshotTransport,
    destination: &SnapshotDestination,
    records: &[ShapeRecord],
) -> Vec<PublishOutcome> {
    let mut by_slide: BTreeMap<usize, Vec<ShapeRecord>> = BTreeMap::new();
    for record in records {
        by_slide
            .entry(record.slide_index)
            .or_default()
            .push(record.clone());
    }

    let mut outcomes = Vec::with_capacity(by_slide.len());
    for (slide_index, slide_records) in by_slide {
        let target = destination.for_slide(slide_index);
        outcomes.push(publish_snapshot(transport, &target, &slide_records).await);
    }
    outcomes
}
