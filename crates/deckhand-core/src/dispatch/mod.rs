//! Executing code fragments against the document.
//!
//! - [`dispatcher`]: `Dispatcher::dispatch()`, `DispatchResult`, `ExecutionOutcome`
//! - [`normalize`] : fence stripping and the empty/short check
//! - [`runtime`]   : `FragmentRuntime` trait, `UnitScope`
//! - [`capability`]: `DocumentCapability`
//! - [`policy`]    : `CapabilityPolicy`, first-match-wins, default-deny
//! - [`error`]     : `DispatchError`

pub mod capability;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod policy;
pub mod runtime;

pub use capability::DocumentCapability;
pub use dispatcher::{DispatchConfig, DispatchResult, Dispatcher, ExecutionOutcome};
pub use error::DispatchError;
pub use normalize::{normalize, strip_fences, DEFAULT_MIN_FRAGMENT_LEN};
pub use policy::{CapabilityPolicy, PolicyRule, PolicyVerdict};
pub use runtime::{FragmentRuntime, UnitScope};
