//! Hooks shipped with the tester.

use super::{BeforeExecutionContext, BeforeExecutionHook};
use crate::error::TesterError;
use crate::ordering::HookOrder;

/// The Warnings NG plugin keeps its tests in failsafe-bound integration
/// tests, so the plain surefire invocation would run nothing. Appends the
/// failsafe goal for that plugin only.
pub struct WarningsNgExecutionHook;

impl WarningsNgExecutionHook {
    const FAILSAFE_GOAL: &'static str = "failsafe:integration-test";
}

impl HookOrder for WarningsNgExecutionHook {
    fn id(&self) -> &str {
        "WarningsNgExecutionHook"
    }
}

impl BeforeExecutionHook for WarningsNgExecutionHook {
    fn check(&self, context: &BeforeExecutionContext<'_>) -> bool {
        // warnings-ng-parent is seen for local checkouts of the reactor root
        matches!(
            context.metadata.plugin_id.as_str(),
            "warnings-ng" | "warnings-ng-parent"
        )
    }

    fn action(&self, context: &mut BeforeExecutionContext<'_>) -> Result<(), TesterError> {
        if !context.goals.iter().any(|g| g == Self::FAILSAFE_GOAL) {
            context.goals.push(Self::FAILSAFE_GOAL.to_string());
        }
        Ok(())
    }
}
