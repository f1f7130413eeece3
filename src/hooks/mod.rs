//! Hook pipeline.
//!
//! Hooks are synchronous callbacks registered against a [`HookType`] lifecycle
//! point. The [`HookRegistry`] keeps them in registration order and dispatches
//! them against a per-operation [`ExecutionContext`].
//!
//! Hooks run inline on the dispatching task: a hook that blocks stalls the
//! operation it was dispatched for. Keep them short.

pub mod context;
pub mod registry;
pub mod types;

pub use context::{ContextError, ExecutionContext, Metadata, Operation};
pub use registry::{HookInfo, HookRegistry};
pub use types::{CUSTOM_HOOK_BASE, Hook, HookFn, HookResult, HookType};
