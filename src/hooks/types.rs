//! Hook identifiers, callables and results.

use crate::error::BoxError;
use crate::hooks::ExecutionContext;
use std::sync::Arc;

/// First numeric value available to extension hook types.
pub const CUSTOM_HOOK_BASE: u32 = 1000;

/// Lifecycle point a hook is registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookType {
    BeforeConnection,
    AfterConnection,
    BeforeAcquire,
    AfterAcquire,
    BeforeQuery,
    AfterQuery,
    BeforeExec,
    AfterExec,
    BeforeTransaction,
    AfterTransaction,
    BeforeBatch,
    AfterBatch,
    BeforeRelease,
    AfterRelease,
    OnError,
    /// Extension point. Only values `>= CUSTOM_HOOK_BASE` are accepted by the registry.
    Custom(u32),
}

impl HookType {
    /// All built-in lifecycle points, in lifecycle order.
    pub const BUILTIN: [HookType; 15] = [
        HookType::BeforeConnection,
        HookType::AfterConnection,
        HookType::BeforeAcquire,
        HookType::AfterAcquire,
        HookType::BeforeQuery,
        HookType::AfterQuery,
        HookType::BeforeExec,
        HookType::AfterExec,
        HookType::BeforeTransaction,
        HookType::AfterTransaction,
        HookType::BeforeBatch,
        HookType::AfterBatch,
        HookType::BeforeRelease,
        HookType::AfterRelease,
        HookType::OnError,
    ];

    /// Extension hook type at `offset` past [`CUSTOM_HOOK_BASE`].
    pub fn custom(offset: u32) -> Self {
        HookType::Custom(CUSTOM_HOOK_BASE.saturating_add(offset))
    }

    /// Numeric code of this hook type.
    pub fn code(&self) -> u32 {
        match self {
            HookType::Custom(code) => *code,
            builtin => HookType::BUILTIN
                .iter()
                .position(|t| t == builtin)
                .map(|idx| idx as u32)
                .unwrap_or(0),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.code() >= CUSTOM_HOOK_BASE
    }

    pub fn name(&self) -> &'static str {
        match self {
            HookType::BeforeConnection => "before_connection",
            HookType::AfterConnection => "after_connection",
            HookType::BeforeAcquire => "before_acquire",
            HookType::AfterAcquire => "after_acquire",
            HookType::BeforeQuery => "before_query",
            HookType::AfterQuery => "after_query",
            HookType::BeforeExec => "before_exec",
            HookType::AfterExec => "after_exec",
            HookType::BeforeTransaction => "before_transaction",
            HookType::AfterTransaction => "after_transaction",
            HookType::BeforeBatch => "before_batch",
            HookType::AfterBatch => "after_batch",
            HookType::BeforeRelease => "before_release",
            HookType::AfterRelease => "after_release",
            HookType::OnError => "on_error",
            HookType::Custom(_) => "custom",
        }
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookType::Custom(code) => write!(f, "custom({})", code),
            other => f.write_str(other.name()),
        }
    }
}

/// Outcome of one hook invocation.
#[derive(Debug, Default)]
pub struct HookResult {
    /// `false` halts the chain at this hook.
    pub continue_chain: bool,
    /// Present together with `continue_chain == false` to fail the operation.
    pub error: Option<BoxError>,
    /// Merged into the context's metadata extensions after the hook returns.
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl HookResult {
    /// Let the chain continue.
    pub fn proceed() -> Self {
        Self {
            continue_chain: true,
            ..Default::default()
        }
    }

    /// Halt the chain without failing the operation.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Halt the chain and fail the operation.
    pub fn fail(error: impl Into<BoxError>) -> Self {
        Self {
            continue_chain: false,
            error: Some(error.into()),
            data: None,
        }
    }

    /// Attach a payload for downstream hooks.
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

/// Callable behind a [`Hook`].
pub type HookFn = Arc<dyn Fn(&mut ExecutionContext) -> HookResult + Send + Sync>;

/// A hook handle. A default-constructed handle is empty and is rejected at registration.
#[derive(Clone, Default)]
pub struct Hook {
    func: Option<HookFn>,
}

impl Hook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ExecutionContext) -> HookResult + Send + Sync + 'static,
    {
        Self {
            func: Some(Arc::new(f)),
        }
    }

    /// An empty handle, e.g. an unfilled configuration slot.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_none()
    }

    pub(crate) fn call(&self, ctx: &mut ExecutionContext) -> HookResult {
        match &self.func {
            Some(f) => f(ctx),
            None => HookResult::proceed(),
        }
    }
}

impl From<HookFn> for Hook {
    fn from(func: HookFn) -> Self {
        Self { func: Some(func) }
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_codes_below_custom_base() {
        for hook_type in HookType::BUILTIN {
            assert!(hook_type.code() < CUSTOM_HOOK_BASE);
            assert!(!hook_type.is_custom());
        }
        assert_eq!(HookType::BeforeConnection.code(), 0);
        assert_eq!(HookType::OnError.code(), 14);
    }

    #[test]
    fn test_custom_constructor() {
        let t = HookType::custom(5);
        assert_eq!(t.code(), CUSTOM_HOOK_BASE + 5);
        assert!(t.is_custom());
        assert!(!HookType::Custom(3).is_custom());
    }

    #[test]
    fn test_hook_type_display() {
        assert_eq!(HookType::BeforeQuery.to_string(), "before_query");
        assert_eq!(HookType::custom(1).to_string(), "custom(1001)");
    }

    #[test]
    fn test_hook_result_constructors() {
        assert!(HookResult::proceed().continue_chain);
        let stop = HookResult::stop();
        assert!(!stop.continue_chain && stop.error.is_none());
        let fail = HookResult::fail("denied");
        assert!(!fail.continue_chain && fail.error.is_some());
    }

    #[test]
    fn test_empty_hook() {
        assert!(Hook::empty().is_empty());
        assert!(!Hook::new(|_| HookResult::proceed()).is_empty());
    }
}
