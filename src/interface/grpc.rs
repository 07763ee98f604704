//! # gRPC Service
//!
//! Implements `AIProjectHelper`. Every call validates its request, then runs on its own
//! task: it waits for a slot in the bounded call pool, leases the project directory and
//! forwards each `Feedback` into a bounded channel as soon as it is produced. The
//! response stream is the receiving end of that channel.

use futures::StreamExt;
use futures::stream::BoxStream;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::application::agent::{Agent, RuntimeContext};
use crate::application::fetcher::{PlanFetcher, PlanRequest};
use crate::application::project::{self, ProjectBootstrap};
use crate::application::steps;
use crate::application::workspace::{ProjectWorkspaces, normalize_project_id};
use crate::domain::config::AppConfig;
use crate::domain::errors::{FetchError, WorkspaceError};
use crate::domain::traits::LlmProvider;
use crate::domain::types::{ActionStatus, Feedback, StepPosition};
use crate::interface::proto::ai_project_helper_server::AiProjectHelper;
use crate::interface::proto::{
    ActionFeedback, CreateProjectRequest, PlanExecuteRequest, PlanGetRequest,
    PlanThenExecuteRequest,
};
use crate::strings::{logs, messages};

pub type FeedbackStream = ReceiverStream<Result<ActionFeedback, Status>>;

/// Events of one call. An `Err` ends the call with that status.
type CallEvents = BoxStream<'static, Result<Feedback, Status>>;

#[derive(Clone)]
pub struct HelperService {
    config: Arc<AppConfig>,
    workspaces: Arc<ProjectWorkspaces>,
    llm: Arc<dyn LlmProvider>,
    permits: Arc<Semaphore>,
}

impl HelperService {
    pub fn new(config: AppConfig, llm: Arc<dyn LlmProvider>) -> Self {
        let workspaces = Arc::new(ProjectWorkspaces::new(config.workspace.base_dir()));
        let permits = Arc::new(Semaphore::new(config.server.max_concurrent_calls.max(1)));
        tracing::info!(
            "Project workspaces under {} ({} concurrent calls)",
            workspaces.base().display(),
            config.server.max_concurrent_calls.max(1)
        );
        Self {
            config: Arc::new(config),
            workspaces,
            llm,
            permits,
        }
    }

    fn agent(&self, working_dir: PathBuf, model: &str, llm_url: &str) -> Agent {
        let execution = &self.config.execution;
        let mut ctx = RuntimeContext::new(working_dir)
            .with_translator(self.llm.clone())
            .with_policy(execution.on_failure);
        ctx.translate_steps = execution.translate_steps;
        ctx.output_buffer = execution.output_buffer;
        ctx.model = model.to_string();
        ctx.llm_url = llm_url.to_string();
        Agent::new(ctx)
    }

    fn fetcher(&self) -> PlanFetcher {
        PlanFetcher::new(self.llm.clone(), self.config.fetch.max_parts)
            .with_archive(self.config.fetch.archive_dir.as_ref().map(PathBuf::from))
    }

    /// Runs `events` on a new task once a pool slot and the project lease are held.
    fn spawn_call<F>(&self, rpc: &'static str, project_id: String, events: F) -> FeedbackStream
    where
        F: FnOnce(PathBuf) -> CallEvents + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.server.feedback_buffer.max(1));
        let permits = self.permits.clone();
        let workspaces = self.workspaces.clone();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                let _ = tx.send(Err(Status::unavailable("server is shutting down"))).await;
                return;
            };
            let lease = match workspaces.lease(&project_id).await {
                Ok(lease) => lease,
                Err(err) => {
                    tracing::error!("{} for project '{}': {}", rpc, project_id, err);
                    let _ = tx.send(Err(workspace_status(err))).await;
                    return;
                }
            };

            let mut events = events(lease.working_dir.clone());
            while let Some(event) = events.next().await {
                let fatal = event.is_err();
                if tx.send(event.map(ActionFeedback::from)).await.is_err() {
                    // Dropping `events` kills any running child process.
                    tracing::warn!("{}", logs::caller_gone(rpc, &lease.project_id));
                    return;
                }
                if fatal {
                    break;
                }
            }
            tracing::info!("{}", logs::call_finished(rpc, &lease.project_id));
        });

        ReceiverStream::new(rx)
    }
}

fn workspace_status(err: WorkspaceError) -> Status {
    match &err {
        WorkspaceError::InvalidProjectId(_) => Status::invalid_argument(err.to_string()),
        WorkspaceError::Create { .. } => Status::internal(err.to_string()),
    }
}

fn project_id(raw: &str) -> Result<String, Status> {
    normalize_project_id(raw).map_err(workspace_status)
}

fn require(field: &str, value: &str) -> Result<(), Status> {
    if value.trim().is_empty() {
        return Err(Status::invalid_argument(format!("{field} must not be empty")));
    }
    Ok(())
}

/// The one feedback per fetch that carries the plan itself.
fn plan_delivered(plan: &str) -> Feedback {
    let total = steps::split_plan(plan).len();
    Feedback::plan_event(
        messages::PLAN_ACTION_TYPE,
        messages::PLAN_COMPLETE,
        ActionStatus::Success,
        StepPosition::new(0, total),
    )
    .with_complete_plan(plan)
}

fn plan_failed(err: &FetchError) -> Feedback {
    Feedback::plan_event(
        messages::PLAN_ACTION_TYPE,
        messages::plan_fetch_failed(&err.to_string()),
        ActionStatus::Failed,
        StepPosition::default(),
    )
    .with_error(err.to_string())
    .with_exit_code(1)
}

fn script_event(status: ActionStatus, description: impl Into<String>) -> Feedback {
    Feedback::plan_event(
        messages::SCRIPT_ACTION_TYPE,
        description,
        status,
        StepPosition::new(1, 1),
    )
}

/// Fetches the plan and yields it, then (when `run` is set) executes it.
fn fetch_events(
    service: HelperService,
    fetcher: PlanFetcher,
    request: PlanRequest,
    working_dir: PathBuf,
    run: bool,
) -> CallEvents {
    Box::pin(async_stream::stream! {
        let plan = match fetcher.fetch(&request).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::error!("Plan fetch for project '{}' failed: {}", request.project_id, err);
                yield Ok(plan_failed(&err));
                yield Err(Status::internal(err.to_string()));
                return;
            }
        };
        yield Ok(plan_delivered(&plan));

        if run {
            let mut events = service
                .agent(working_dir, &request.model, &request.llm_url)
                .run_plan(plan);
            while let Some(feedback) = events.next().await {
                yield Ok(feedback);
            }
        }
    })
}

#[tonic::async_trait]
impl AiProjectHelper for HelperService {
    type RunPlanStream = FeedbackStream;
    type GetPlanStream = FeedbackStream;
    type GetPlanThenRunStream = FeedbackStream;
    type CreateProjectStream = FeedbackStream;

    async fn run_plan(
        &self,
        request: Request<PlanExecuteRequest>,
    ) -> Result<Response<Self::RunPlanStream>, Status> {
        let req = request.into_inner();
        let project_id = project_id(&req.project_id)?;
        tracing::info!("{}", logs::call_started("RunPlan", &project_id, req.plan_text.len()));

        let service = self.clone();
        let stream = self.spawn_call("RunPlan", project_id, move |working_dir| {
            service
                .agent(working_dir, "", "")
                .run_plan(req.plan_text)
                .map(Ok)
                .boxed()
        });
        Ok(Response::new(stream))
    }

    async fn get_plan(
        &self,
        request: Request<PlanGetRequest>,
    ) -> Result<Response<Self::GetPlanStream>, Status> {
        let req = request.into_inner();
        let project_id = project_id(&req.project_id)?;
        require("requirement", &req.requirement)?;
        tracing::info!("{}", logs::call_started("GetPlan", &project_id, req.requirement.len()));

        let plan_request = PlanRequest {
            requirement: req.requirement,
            model: req.model,
            llm_url: req.llm_url,
            project_id: project_id.clone(),
        };
        let service = self.clone();
        let fetcher = self.fetcher();
        let stream = self.spawn_call("GetPlan", project_id, move |working_dir| {
            fetch_events(service, fetcher, plan_request, working_dir, false)
        });
        Ok(Response::new(stream))
    }

    async fn get_plan_then_run(
        &self,
        request: Request<PlanThenExecuteRequest>,
    ) -> Result<Response<Self::GetPlanThenRunStream>, Status> {
        let req = request.into_inner();
        let project_id = project_id(&req.project_id)?;
        require("requirement", &req.requirement)?;
        tracing::info!(
            "{}",
            logs::call_started("GetPlanThenRun", &project_id, req.requirement.len())
        );

        let plan_request = PlanRequest {
            requirement: req.requirement,
            model: req.model,
            llm_url: req.llm_url,
            project_id: project_id.clone(),
        };
        let service = self.clone();
        let fetcher = self.fetcher();
        let stream = self.spawn_call("GetPlanThenRun", project_id, move |working_dir| {
            fetch_events(service, fetcher, plan_request, working_dir, true)
        });
        Ok(Response::new(stream))
    }

    async fn create_project(
        &self,
        request: Request<CreateProjectRequest>,
    ) -> Result<Response<Self::CreateProjectStream>, Status> {
        let req = request.into_inner();
        let project_id = project_id(&req.project_id)?;
        require("project_steps", &req.project_steps)?;
        tracing::info!(
            "{}",
            logs::call_started("CreateProject", &project_id, req.project_steps.len())
        );

        let service = self.clone();
        let bootstrap = ProjectBootstrap::new(self.llm.clone(), self.config.llm.script_max_tokens);
        let stream = self.spawn_call("CreateProject", project_id, move |working_dir| {
            Box::pin(async_stream::stream! {
                let content = match bootstrap.generate(&req.project_steps).await {
                    Ok(content) => content,
                    Err(err) => {
                        tracing::error!("Project script generation failed: {}", err);
                        yield Ok(script_event(
                            ActionStatus::Failed,
                            messages::script_generation_failed(&err.to_string()),
                        )
                        .with_error(err.to_string())
                        .with_exit_code(1));
                        yield Err(Status::internal(err.to_string()));
                        return;
                    }
                };

                let script = match project::write_script(&working_dir, &content).await {
                    Ok(script) => script,
                    Err(err) => {
                        tracing::error!("{:#}", err);
                        yield Ok(script_event(
                            ActionStatus::Failed,
                            messages::script_generation_failed(&format!("{err:#}")),
                        )
                        .with_error(format!("{err:#}"))
                        .with_exit_code(1));
                        return;
                    }
                };
                yield Ok(script_event(ActionStatus::Success, messages::SCRIPT_GENERATED)
                    .with_output(script.content.clone())
                    .with_command(script.file_name.clone()));

                let mut events = service.agent(working_dir, "", "").run_actions(vec![script.action()]);
                while let Some(feedback) = events.next().await {
                    yield Ok(feedback);
                }
            })
        });
        Ok(Response::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_delivered_counts_steps() {
        let feedback = plan_delivered("a\n------\nb\n------\nc");
        assert_eq!(feedback.total_steps, 3);
        assert_eq!(feedback.action_type, "llm_plan");
        assert_eq!(feedback.status, ActionStatus::Success);
        assert!(feedback.complete_plan.is_some());
    }

    #[test]
    fn test_workspace_status_codes() {
        let status = workspace_status(WorkspaceError::InvalidProjectId("..".into()));
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(require("requirement", "  ").unwrap_err().code(), tonic::Code::InvalidArgument);
        assert_eq!(project_id("").unwrap(), "default");
    }
}
