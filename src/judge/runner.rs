//! Single-case execution shared by judging and test runs

use std::sync::Arc;

use crate::{
    judge::{
        languages::{LanguageHandler, RecipeSettings},
        verdict::{evaluate, CaseLimits, CaseOutcome},
    },
    models::JudgeCase,
    sandbox::{ExecRequest, Sandbox},
};

/// Builds a recipe for a case, runs it and maps the result
#[derive(Clone)]
pub struct CaseRunner {
    sandbox: Arc<dyn Sandbox>,
    settings: RecipeSettings,
}

impl CaseRunner {
    pub fn new(sandbox: Arc<dyn Sandbox>, settings: RecipeSettings) -> Self {
        Self { sandbox, settings }
    }

    /// Run one case; sandbox faults come back as `SE` outcomes
    pub async fn run(
        &self,
        handler: &LanguageHandler,
        source: &str,
        case: &JudgeCase,
        limits: CaseLimits,
    ) -> CaseOutcome {
        let recipe = handler.build_command(
            source,
            case.input.len(),
            limits.time_limit_ms,
            &self.settings,
        );

        let request = ExecRequest {
            image: recipe.image,
            command: recipe.command,
            stdin: case.input.as_bytes().to_vec(),
            wall_timeout_ms: recipe.deadline_ms,
            memory_limit_mb: limits.memory_limit_mb,
        };

        match self.sandbox.run(request).await {
            Ok(exec) => evaluate(&exec, case.expected.as_deref(), limits),
            Err(err) => {
                tracing::error!(
                    kind = %err.kind,
                    language = handler.language(),
                    error = %err.message,
                    "Sandbox execution failed"
                );
                CaseOutcome::from_sandbox_error(&err)
            }
        }
    }
}
