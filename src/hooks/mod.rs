//! Hook pipelines: predicate-gated extension points around the checkout,
//! compilation and execution steps.
//!
//! Hooks exist to work around known irregularities in individual plugins
//! without special-casing the orchestrator. Each phase has its own context
//! type, created fresh per plugin and handed to every matching hook in
//! ordering-policy order; hooks hold `&mut` access strictly during their
//! turn. All matching hooks run; there is no short-circuit on mutation, and
//! a hook error aborts the remaining pipeline and the current plugin.

pub mod builtin;

use crate::config::TesterConfig;
use crate::error::TesterError;
use crate::metadata::PluginMetadata;
use crate::ordering::{compare_order, HookOrder};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Context of the before-checkout phase. The metadata is owned so hooks can
/// rewrite it (typically the SCM URL of a known-moved repository) before
/// grouping and cloning happen.
pub struct BeforeCheckoutContext<'a> {
    pub metadata: PluginMetadata,
    pub core_version: &'a str,
    pub config: &'a TesterConfig,
}

/// Context of the before-compilation phase, after the sources are checked
/// out.
pub struct BeforeCompilationContext<'a> {
    pub metadata: &'a PluginMetadata,
    pub core_version: &'a str,
    pub config: &'a TesterConfig,
    pub checkout_dir: &'a Path,
}

/// Context of the before-execution phase. Hooks may add or remove build
/// goals and inject build properties; the orchestrator force-injects its own
/// properties after the pipeline ran.
pub struct BeforeExecutionContext<'a> {
    pub metadata: &'a PluginMetadata,
    pub core_version: &'a str,
    pub config: &'a TesterConfig,
    pub checkout_dir: &'a Path,
    pub goals: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

pub trait BeforeCheckoutHook: HookOrder + Send + Sync {
    fn check(&self, _context: &BeforeCheckoutContext<'_>) -> bool {
        true
    }

    fn action(&self, context: &mut BeforeCheckoutContext<'_>) -> Result<(), TesterError>;
}

pub trait BeforeCompilationHook: HookOrder + Send + Sync {
    fn check(&self, _context: &BeforeCompilationContext<'_>) -> bool {
        true
    }

    fn action(&self, context: &mut BeforeCompilationContext<'_>) -> Result<(), TesterError>;
}

pub trait BeforeExecutionHook: HookOrder + Send + Sync {
    fn check(&self, _context: &BeforeExecutionContext<'_>) -> bool {
        true
    }

    fn action(&self, context: &mut BeforeExecutionContext<'_>) -> Result<(), TesterError>;
}

/// All registered hooks, discovered once at start-up and read-only for the
/// rest of the run.
#[derive(Default)]
pub struct HookRegistry {
    checkout: Vec<Box<dyn BeforeCheckoutHook>>,
    compilation: Vec<Box<dyn BeforeCompilationHook>>,
    execution: Vec<Box<dyn BeforeExecutionHook>>,
}

macro_rules! run_pipeline {
    ($hooks:expr, $context:expr, $phase:literal) => {{
        let hooks = &$hooks;
        let mut indices: Vec<usize> = (0..hooks.len()).collect();
        indices.sort_by(|&a, &b| {
            compare_order(hooks[a].order(), hooks[a].id(), hooks[b].order(), hooks[b].id())
        });
        for index in indices {
            let hook = &hooks[index];
            if !hook.check($context) {
                continue;
            }
            debug!(hook = hook.id(), phase = $phase, "running hook");
            hook.action($context).map_err(|e| match e {
                already @ TesterError::Hook { .. } => already,
                other => TesterError::Hook {
                    hook: hook.id().to_string(),
                    message: other.to_string(),
                },
            })?;
        }
        Ok(())
    }};
}

impl HookRegistry {
    pub fn builder() -> HookRegistryBuilder {
        HookRegistryBuilder::default()
    }

    pub fn run_before_checkout(
        &self,
        context: &mut BeforeCheckoutContext<'_>,
    ) -> Result<(), TesterError> {
        run_pipeline!(&self.checkout, context, "before-checkout")
    }

    pub fn run_before_compilation(
        &self,
        context: &mut BeforeCompilationContext<'_>,
    ) -> Result<(), TesterError> {
        run_pipeline!(&self.compilation, context, "before-compilation")
    }

    pub fn run_before_execution(
        &self,
        context: &mut BeforeExecutionContext<'_>,
    ) -> Result<(), TesterError> {
        run_pipeline!(&self.execution, context, "before-execution")
    }
}

/// Registers hooks from every configured extension location, applies the
/// exclusion list, then freezes the registry.
#[derive(Default)]
pub struct HookRegistryBuilder {
    registry: HookRegistry,
    excluded: Vec<String>,
}

impl HookRegistryBuilder {
    /// Registers the hooks shipped with the tester.
    pub fn with_builtin(self) -> Self {
        self.register_execution(Box::new(builtin::WarningsNgExecutionHook))
    }

    pub fn register_checkout(mut self, hook: Box<dyn BeforeCheckoutHook>) -> Self {
        self.registry.checkout.push(hook);
        self
    }

    pub fn register_compilation(mut self, hook: Box<dyn BeforeCompilationHook>) -> Self {
        self.registry.compilation.push(hook);
        self
    }

    pub fn register_execution(mut self, hook: Box<dyn BeforeExecutionHook>) -> Self {
        self.registry.execution.push(hook);
        self
    }

    pub fn exclude(mut self, id: impl Into<String>) -> Self {
        self.excluded.push(id.into());
        self
    }

    pub fn build(self) -> HookRegistry {
        let excluded = self.excluded;
        let mut registry = self.registry;
        registry.checkout.retain(|h| !excluded.iter().any(|x| x == h.id()));
        registry
            .compilation
            .retain(|h| !excluded.iter().any(|x| x == h.id()));
        registry
            .execution
            .retain(|h| !excluded.iter().any(|x| x == h.id()));
        registry
    }
}
