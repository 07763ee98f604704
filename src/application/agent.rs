//! # Plan Agent
//!
//! Drives plan text through the step splitter, the action parser and the executors,
//! turning every stage into a stream of `Feedback` events.
//!
//! Per action the stream is: one `running` event on dispatch, one `running` event per
//! output chunk, then exactly one terminal event. Actions run one at a time in parse order.
//! A `failed` action ends its step; with `FailurePolicy::AbortPlan` it also ends the plan.

use futures::StreamExt;
use futures::stream::BoxStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::{parsing, sandbox, steps};
use crate::domain::config::FailurePolicy;
use crate::domain::traits::{CompletionRequest, LlmProvider};
use crate::domain::types::{
    Action, ActionKind, ActionStatus, Feedback, StepPosition,
};
use crate::infrastructure::tools::ToolExecutor;
use crate::strings::{logs, messages, prompts};

/// Everything an agent needs for one call. Built per request by the service.
#[derive(Clone)]
pub struct RuntimeContext {
    pub working_dir: PathBuf,
    /// Completion endpoint for translating natural-language steps.
    pub translator: Option<Arc<dyn LlmProvider>>,
    pub policy: FailurePolicy,
    pub translate_steps: bool,
    pub output_buffer: usize,
    /// Per-request model override; empty keeps the configured one.
    pub model: String,
    /// Per-request endpoint override; empty keeps the configured one.
    pub llm_url: String,
}

impl RuntimeContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            translator: None,
            policy: FailurePolicy::default(),
            translate_steps: true,
            output_buffer: 64,
            model: String::new(),
            llm_url: String::new(),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn LlmProvider>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Clone)]
pub struct Agent {
    ctx: RuntimeContext,
    executor: ToolExecutor,
}

impl Agent {
    pub fn new(ctx: RuntimeContext) -> Self {
        let executor = ToolExecutor::new(ctx.working_dir.clone(), ctx.output_buffer);
        Self { ctx, executor }
    }

    /// Splits the plan into steps and runs them in order.
    pub fn run_plan(self, plan_text: String) -> BoxStream<'static, Feedback> {
        Box::pin(async_stream::stream! {
            let steps = steps::split_plan(&plan_text);
            let total = steps.len();
            tracing::info!("Running plan with {} step(s) in {}", total, self.ctx.working_dir.display());

            for (i, step_text) in steps.into_iter().enumerate() {
                let position = StepPosition::new(i + 1, total);
                let mut failed = false;
                let mut events = self.run_step(step_text, position);
                while let Some(feedback) = events.next().await {
                    failed |= feedback.status == ActionStatus::Failed;
                    yield feedback;
                }
                if failed && self.ctx.policy == FailurePolicy::AbortPlan {
                    if position.index < position.total {
                        tracing::warn!(
                            "Step {}/{} failed, skipping the remaining {} step(s)",
                            position.index,
                            position.total,
                            position.total - position.index
                        );
                    }
                    break;
                }
            }
        })
    }

    /// Runs already-built actions as one step.
    pub fn run_actions(self, actions: Vec<Action>) -> BoxStream<'static, Feedback> {
        Box::pin(async_stream::stream! {
            let position = StepPosition::new(1, 1);
            let mut events = self.execute_step(actions, position);
            while let Some(feedback) = events.next().await {
                yield feedback;
            }
        })
    }

    fn run_step(&self, step_text: String, position: StepPosition) -> BoxStream<'_, Feedback> {
        Box::pin(async_stream::stream! {
            let actions = match self.actions_for_step(&step_text, position).await {
                Ok(actions) => actions,
                Err(feedback) => {
                    yield feedback;
                    return;
                }
            };
            let mut events = self.execute_step(actions, position);
            while let Some(feedback) = events.next().await {
                yield feedback;
            }
        })
    }

    fn execute_step(&self, actions: Vec<Action>, position: StepPosition) -> BoxStream<'_, Feedback> {
        Box::pin(async_stream::stream! {
            if actions.is_empty() {
                yield step_event(ActionStatus::Warning, position).with_error(messages::STEP_HAS_NO_ACTIONS);
                return;
            }
            for (idx, action) in actions.iter().enumerate() {
                let mut terminal = ActionStatus::Running;
                let mut events = self.run_action(idx, action, position);
                while let Some(feedback) = events.next().await {
                    if feedback.status.is_terminal() {
                        terminal = feedback.status;
                    }
                    yield feedback;
                }
                if terminal == ActionStatus::Failed {
                    if idx + 1 < actions.len() {
                        tracing::warn!(
                            "Action #{} failed, skipping {} remaining action(s) of step {}",
                            idx,
                            actions.len() - idx - 1,
                            position.index
                        );
                    }
                    break;
                }
            }
        })
    }

    /// Parses the step, translating it through the LLM first when it carries no function blocks.
    /// The `Err` side is the feedback that ends the step.
    async fn actions_for_step(
        &self,
        step_text: &str,
        position: StepPosition,
    ) -> Result<Vec<Action>, Feedback> {
        let source = if parsing::contains_function_calls(step_text) {
            step_text.to_string()
        } else {
            match (&self.ctx.translator, self.ctx.translate_steps) {
                (Some(translator), true) => self.translate(translator.as_ref(), step_text, position).await?,
                _ => {
                    return Err(step_event(ActionStatus::Warning, position)
                        .with_error(messages::STEP_NOT_TRANSLATED));
                }
            }
        };

        parsing::parse_actions(&source).map_err(|e| {
            tracing::error!("Step {}/{} parse error: {}", position.index, position.total, e);
            step_event(ActionStatus::Failed, position).with_error(messages::step_parse_failed(&e.to_string()))
        })
    }

    async fn translate(
        &self,
        translator: &dyn LlmProvider,
        step_text: &str,
        position: StepPosition,
    ) -> Result<String, Feedback> {
        let prompt = prompts::action_parser_prompt(step_text, &self.ctx.working_dir.display().to_string());
        let request = CompletionRequest::new(prompt)
            .with_model(&self.ctx.model)
            .with_endpoint(&self.ctx.llm_url);

        match translator.completion(request).await {
            Ok(raw) => {
                tracing::debug!("Step {} translated into:\n{}", position.index, raw);
                Ok(raw)
            }
            Err(e) => {
                tracing::error!("Step {} translation failed: {}", position.index, e);
                Err(step_event(ActionStatus::Failed, position)
                    .with_error(messages::step_translation_failed(&e.to_string())))
            }
        }
    }

    fn run_action<'a>(
        &'a self,
        idx: usize,
        action: &'a Action,
        position: StepPosition,
    ) -> BoxStream<'a, Feedback> {
        Box::pin(async_stream::stream! {
            tracing::info!("{}", logs::executing_action(position.index, idx, action.action_type(), &action.description));
            yield Feedback::for_action(idx, action, position, ActionStatus::Running);

            let dispatched = strip_caller_paths(action, &self.ctx.working_dir);
            let mut chunks = self.executor.execute(&dispatched);
            let mut terminal = None;

            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => match chunk.exit {
                        None => {
                            yield Feedback::for_action(idx, action, position, ActionStatus::Running)
                                .with_output(chunk.stdout)
                                .with_error(chunk.stderr);
                        }
                        Some(exit) => {
                            terminal = Some(
                                Feedback::for_action(idx, action, position, exit.status)
                                    .with_output(chunk.stdout)
                                    .with_error(chunk.stderr)
                                    .with_exit_code(exit.code),
                            );
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::error!("Action #{} ({}) failed: {:#}", idx, action.description, e);
                        terminal = Some(
                            Feedback::for_action(idx, action, position, ActionStatus::Failed)
                                .with_error(messages::action_aborted(&format!("{:#}", e)))
                                .with_exit_code(1),
                        );
                        break;
                    }
                }
            }

            yield terminal.unwrap_or_else(|| {
                tracing::error!("Action #{} ended without an exit status", idx);
                Feedback::for_action(idx, action, position, ActionStatus::Failed)
                    .with_error(messages::action_aborted("executor ended without an exit status"))
                    .with_exit_code(1)
            });
        })
    }
}

fn step_event(status: ActionStatus, position: StepPosition) -> Feedback {
    Feedback::plan_event(messages::STEP_ACTION_TYPE, messages::STEP_DESCRIPTION, status, position)
}

/// Drops a leading copy of the working directory from path-bearing parameters.
fn strip_caller_paths(action: &Action, working_dir: &Path) -> Action {
    let mut action = action.clone();
    match &mut action.kind {
        ActionKind::Shell(shell) => {
            if let Some(cwd) = shell.cwd.as_mut() {
                *cwd = sandbox::strip_working_dir(cwd, working_dir);
            }
        }
        ActionKind::File(file) => file.path = sandbox::strip_working_dir(&file.path, working_dir),
        ActionKind::Directory(dir) => dir.path = sandbox::strip_working_dir(&dir.path, working_dir),
    }
    action
}
