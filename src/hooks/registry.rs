//! Hook registration and dispatch.
//!
//! One `std::sync::RwLock` guards the whole registry. Dispatch takes the read
//! lock only long enough to snapshot the hooks of one type, so hooks run with
//! no lock held and may themselves register or unregister hooks.

use crate::error::{DbError, DbResult};
use crate::hooks::{CUSTOM_HOOK_BASE, ExecutionContext, Hook, HookType};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

struct RegisteredHook {
    /// Set for hooks registered through `register_custom_hook`.
    name: Option<String>,
    hook: Hook,
}

/// Introspection record returned by [`HookRegistry::list_hooks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInfo {
    pub hook_type: HookType,
    pub count: usize,
    /// Names of the custom hooks, in execution order.
    pub names: Vec<String>,
}

/// Ordered hooks per lifecycle point. Registration order is execution order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<HookType, Vec<RegisteredHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `hook` to the chain for `hook_type`.
    pub fn register_hook(&self, hook_type: HookType, hook: Hook) -> DbResult<()> {
        if hook.is_empty() {
            return Err(DbError::invalid_hook(format!(
                "cannot register an empty hook for {}",
                hook_type
            )));
        }

        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let chain = hooks.entry(hook_type).or_default();
        chain.push(RegisteredHook { name: None, hook });
        debug!(hook_type = %hook_type, position = chain.len(), "Registered hook");
        Ok(())
    }

    /// Register a named hook for an extension hook type.
    ///
    /// Re-registering an existing name replaces that hook in place, keeping its position.
    pub fn register_custom_hook(
        &self,
        hook_type: HookType,
        name: &str,
        hook: Hook,
    ) -> DbResult<()> {
        if name.is_empty() {
            return Err(DbError::invalid_hook("custom hook name cannot be empty"));
        }
        if hook.is_empty() {
            return Err(DbError::invalid_hook(format!(
                "cannot register an empty hook '{}'",
                name
            )));
        }
        if hook_type.code() < CUSTOM_HOOK_BASE {
            return Err(DbError::invalid_hook(format!(
                "custom hook type {} is below the reserved base {}",
                hook_type.code(),
                CUSTOM_HOOK_BASE
            )));
        }

        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let chain = hooks.entry(hook_type).or_default();
        match chain
            .iter_mut()
            .find(|entry| entry.name.as_deref() == Some(name))
        {
            Some(existing) => {
                existing.hook = hook;
                debug!(hook_type = %hook_type, name = %name, "Replaced custom hook");
            }
            None => {
                chain.push(RegisteredHook {
                    name: Some(name.to_string()),
                    hook,
                });
                debug!(hook_type = %hook_type, name = %name, "Registered custom hook");
            }
        }
        Ok(())
    }

    /// Run every hook registered for `hook_type`, in registration order.
    ///
    /// The first hook returning `continue_chain == false` halts the chain:
    /// with an error the dispatch fails with [`DbError::HookFailed`], without
    /// one it fails with [`DbError::HookStopped`].
    pub fn execute_hooks(&self, hook_type: HookType, ctx: &mut ExecutionContext) -> DbResult<()> {
        let chain: Vec<Hook> = {
            let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
            match hooks.get(&hook_type) {
                Some(chain) if !chain.is_empty() => {
                    chain.iter().map(|entry| entry.hook.clone()).collect()
                }
                _ => return Ok(()),
            }
        };

        for (idx, hook) in chain.iter().enumerate() {
            let result = hook.call(ctx);
            if let Some(data) = result.data {
                ctx.metadata.merge(data);
            }
            if result.continue_chain {
                continue;
            }

            return Err(match result.error {
                Some(source) => {
                    warn!(
                        hook_type = %hook_type,
                        position = idx,
                        operation_id = %ctx.operation_id,
                        error = %source,
                        "Hook failed the operation"
                    );
                    DbError::hook_failed(hook_type, source)
                }
                None => {
                    debug!(
                        hook_type = %hook_type,
                        position = idx,
                        operation_id = %ctx.operation_id,
                        "Hook requested stop"
                    );
                    DbError::hook_stopped(hook_type)
                }
            });
        }

        Ok(())
    }

    /// Remove every hook registered for `hook_type`, named or not.
    pub fn unregister_hook(&self, hook_type: HookType) {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(removed) = hooks.remove(&hook_type) {
            debug!(hook_type = %hook_type, count = removed.len(), "Unregistered hooks");
        }
    }

    /// Remove one named hook. Removing a name that is not registered is not an error.
    pub fn unregister_custom_hook(&self, hook_type: HookType, name: &str) -> DbResult<()> {
        if name.is_empty() {
            return Err(DbError::invalid_hook("custom hook name cannot be empty"));
        }

        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(chain) = hooks.get_mut(&hook_type) {
            let before = chain.len();
            chain.retain(|entry| entry.name.as_deref() != Some(name));
            if chain.len() != before {
                debug!(hook_type = %hook_type, name = %name, "Unregistered custom hook");
            }
            if chain.is_empty() {
                hooks.remove(&hook_type);
            }
        }
        Ok(())
    }

    /// Snapshot of every hook type with at least one hook, ordered by type code.
    pub fn list_hooks(&self) -> Vec<HookInfo> {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        let mut infos: Vec<HookInfo> = hooks
            .iter()
            .filter(|(_, chain)| !chain.is_empty())
            .map(|(hook_type, chain)| HookInfo {
                hook_type: *hook_type,
                count: chain.len(),
                names: chain.iter().filter_map(|entry| entry.name.clone()).collect(),
            })
            .collect();
        infos.sort_by_key(|info| info.hook_type.code());
        infos
    }

    pub fn has_hooks(&self, hook_type: HookType) -> bool {
        self.hook_count(hook_type) > 0
    }

    pub fn hook_count(&self, hook_type: HookType) -> usize {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        hooks.get(&hook_type).map(Vec::len).unwrap_or(0)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.list_hooks())
            .finish()
    }
}
