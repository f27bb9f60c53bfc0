//! Sequential, failure-isolated execution of code units.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, Instrument};

use super::error::DispatchError;
use super::normalize::{normalize, DEFAULT_MIN_FRAGMENT_LEN};
use super::policy::CapabilityPolicy;
use super::runtime::{FragmentRuntime, UnitScope};
use crate::document::{DocumentContext, DocumentHost};
use crate::instruction::{CodeInput, CodeUnit};
use crate::metrics::METRICS;
use crate::obs;

/// Result of running one code unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub unit_key: u32,
    pub succeeded: bool,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

/// Per-unit outcomes in ascending key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub outcomes: Vec<ExecutionOutcome>,
    /// True only if every unit, skipped ones included, succeeded.
    pub overall_succeeded: bool,
}

impl DispatchResult {
    pub fn failed(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub min_fragment_len: usize,
    pub policy: CapabilityPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_fragment_len: DEFAULT_MIN_FRAGMENT_LEN,
            policy: CapabilityPolicy::standard(),
        }
    }
}

/// Runs code units one at a time against a document host.
///
/// Each unit gets its own [`DocumentContext`]. Requests a unit leaves queued
/// are committed with one final sync when it succeeds and dropped when it
/// fails, so a failing unit never leaks half a batch into the next one.
pub struct Dispatcher {
    host: Arc<dyn DocumentHost>,
    runtime: Arc<dyn FragmentRuntime>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        host: Arc<dyn DocumentHost>,
        runtime: Arc<dyn FragmentRuntime>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            host,
            runtime,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run every unit in ascending key order. Never fails as a whole.
    pub async fn dispatch(&self, input: CodeInput) -> DispatchResult {
        let pass_id = uuid::Uuid::new_v4().to_string();
        self.dispatch_units(input.into_units())
            .instrument(obs::pass_span("dispatch", &pass_id))
            .await
    }

    async fn dispatch_units(&self, mut units: Vec<CodeUnit>) -> DispatchResult {
        units.sort_by_key(|unit| unit.unit_key);
        debug!(
            units = units.len(),
            runtime = self.runtime.name(),
            "dispatching code units"
        );

        let mut outcomes = Vec::with_capacity(units.len());
        for unit in units {
            outcomes.push(self.run_unit(unit).await);
        }

        let failed = outcomes.iter().filter(|o| !o.succeeded).count();
        let overall_succeeded = failed == 0;
        obs::emit_dispatch_finished(outcomes.len(), failed, overall_succeeded);
        DispatchResult {
            outcomes,
            overall_succeeded,
        }
    }

    async fn run_unit(&self, unit: CodeUnit) -> ExecutionOutcome {
        let started = Instant::now();
        let result = match normalize(&unit.raw_text, self.config.min_fragment_len) {
            Ok(body) => self.execute(unit.unit_key, &body).await,
            Err(e) => Err(e),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = ExecutionOutcome {
            unit_key: unit.unit_key,
            succeeded: result.is_ok(),
            error_message: result.err().map(|e| e.to_string()),
            duration_ms,
        };
        METRICS.record_unit(outcome.succeeded);
        obs::emit_unit_finished(
            outcome.unit_key,
            outcome.succeeded,
            outcome.duration_ms,
            outcome.error_message.as_deref(),
        );
        outcome
    }

    async fn execute(&self, unit_key: u32, body: &str) -> Result<(), DispatchError> {
        let mut doc = DocumentContext::new(Arc::clone(&self.host));
        let scope = UnitScope::new(unit_key, &self.config.policy);

        let run = AssertUnwindSafe(self.runtime.run(&scope, body, &mut doc))
            .catch_unwind()
            .await;

        let result = match run {
            Ok(result) => result,
            Err(panic) => Err(DispatchError::Panicked(panic_message(panic))),
        };

        match result {
            Ok(()) => {
                doc.sync().await?;
                Ok(())
            }
            Err(e) => {
                let dropped = doc.discard();
                if dropped > 0 {
                    debug!(unit_key, dropped, "discarded unsynchronized requests");
                }
                Err(e)
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
