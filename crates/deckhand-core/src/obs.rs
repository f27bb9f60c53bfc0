//! Structured observability hooks for extraction and dispatch passes.
//!
//! This module provides:
//! - Pass-scoped tracing spans via [`pass_span`]
//! - Emission functions for the key lifecycle events of a pass
//!
//! Events are emitted at `info!` level unless they describe a recovered
//! failure, which is emitted at `warn!`.

use tracing::{info, warn};

/// Span tagged with the pass kind and id.
///
/// Attach it to a pass future with [`tracing::Instrument`] so the future stays
/// `Send`:
///
/// ```ignore
/// run_pass().instrument(obs::pass_span("extract", &pass_id)).await
/// ```
pub fn pass_span(kind: &str, pass_id: &str) -> tracing::Span {
    tracing::info_span!("deckhand.pass", pass = %kind, pass_id = %pass_id)
}

/// Emit event: a shape could not be read and contributes no record.
pub fn emit_shape_skipped(slide_index: usize, z_order_path: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "extract.shape_skipped",
        slide_index = slide_index,
        z_order_path = %z_order_path,
        error = %error,
    );
}

/// Emit event: a slide's shape collection could not be loaded.
pub fn emit_slide_failed(slide_index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "extract.slide_failed", slide_index = slide_index, error = %error);
}

/// Emit event: extraction pass finished.
pub fn emit_extraction_finished(slides: usize, records: usize, skipped: usize, syncs: usize) {
    info!(
        event = "extract.finished",
        slides = slides,
        records = records,
        skipped = skipped,
        syncs = syncs,
    );
}

/// Emit event: a snapshot was handed to the transport.
pub fn emit_snapshot_published(destination: &str, records: usize, success: bool) {
    if success {
        info!(event = "snapshot.published", destination = %destination, records = records);
    } else {
        warn!(event = "snapshot.failed", destination = %destination, records = records);
    }
}

/// Emit event: one code unit finished.
pub fn emit_unit_finished(unit_key: u32, succeeded: bool, duration_ms: u64, error: Option<&str>) {
    if succeeded {
        info!(
            event = "dispatch.unit_finished",
            unit_key = unit_key,
            duration_ms = duration_ms,
            success = true,
        );
    } else {
        warn!(
            event = "dispatch.unit_finished",
            unit_key = unit_key,
            duration_ms = duration_ms,
            success = false,
            error = error.unwrap_or("unknown error"),
        );
    }
}

/// Emit event: dispatch batch finished.
pub fn emit_dispatch_finished(units: usize, failed: usize, success: bool) {
    info!(
        event = "dispatch.finished",
        units = units,
        failed = failed,
        success = success,
    );
}

/// Emit event: a session step failed and will be attempted again.
pub fn emit_step_retry(step: &str, attempt: u32, error: &str) {
    warn!(
        event = "session.step_retry",
        step = %step,
        attempt = attempt,
        error = %error,
    );
}

/// Emit event: a full session cycle finished.
pub fn emit_session_finished(success: bool, dispatched_units: usize) {
    info!(
        event = "session.finished",
        success = success,
        dispatched_units = dispatched_units,
    );
}
