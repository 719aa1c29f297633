//! Scene manager: the single entry point for executing requests.
//!
//! `execute` drives one request through scene selection, cache lookup,
//! the configured execution mode, summarization and final caching,
//! reporting progress as an ordered event stream. `resume` re-enters an
//! execution that suspended on a client-side tool.

use crate::cache::CacheService;
use crate::config::EngineConfig;
use crate::ports::{ActorExecutorPort, CacheStorePort};
use crate::resilience::ChatClientPool;
use crate::use_cases::director::Director;
use crate::use_cases::execute_scene::{SceneExecutor, SceneOutcome};
use crate::use_cases::plan_scenes::Planner;
use crate::use_cases::shared::RunContext;
use crate::use_cases::summarize::Summarizer;
use stagecraft_domain::{
    AiResponse, AiResponseStatus, CacheBehavior, ClientToolOutcome, ContinuationState,
    ContinuationToken, EngineError, ExecutionMode, Message, PendingToolCall, Role, SceneRegistry,
    SceneRequest,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Consumes the ordered event sequence of one execution.
///
/// Dropping the stream cancels the run; `cancel` does so explicitly.
pub struct SceneStream {
    receiver: mpsc::Receiver<AiResponse>,
    cancellation: CancellationToken,
}

impl SceneStream {
    /// Next event, or `None` once the sequence has ended
    pub async fn next(&mut self) -> Option<AiResponse> {
        self.receiver.recv().await
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl Drop for SceneStream {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// Per-sequence parameters threaded through scene execution
struct SequenceRun {
    input: String,
    mode: ExecutionMode,
    re_executions: u32,
    behavior: CacheBehavior,
    result_key: String,
}

/// Orchestrates scene execution end to end.
pub struct SceneManager {
    registry: Arc<SceneRegistry>,
    executor: Arc<SceneExecutor>,
    planner: Arc<Planner>,
    director: Arc<Director>,
    summarizer: Arc<Summarizer>,
    cache: Arc<CacheService>,
    config: Arc<EngineConfig>,
}

impl Clone for SceneManager {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            executor: Arc::clone(&self.executor),
            planner: Arc::clone(&self.planner),
            director: Arc::clone(&self.director),
            summarizer: Arc::clone(&self.summarizer),
            cache: Arc::clone(&self.cache),
            config: Arc::clone(&self.config),
        }
    }
}

impl SceneManager {
    pub fn new(
        registry: SceneRegistry,
        pool: Arc<ChatClientPool>,
        actors: Arc<dyn ActorExecutorPort>,
        cache_store: Arc<dyn CacheStorePort>,
        config: EngineConfig,
    ) -> Self {
        let executor = Arc::new(SceneExecutor::new(
            Arc::clone(&pool),
            actors,
            config.execution.clone(),
        ));
        let planner = Arc::new(Planner::new(Arc::clone(&pool)));
        let director = Arc::new(Director::new(Arc::clone(&pool)));
        let summarizer = Arc::new(Summarizer::new(Arc::clone(&pool), config.summarize.clone()));
        let cache = Arc::new(CacheService::new(cache_store, config.cache.clone()));
        Self {
            registry: Arc::new(registry),
            executor,
            planner,
            director,
            summarizer,
            cache,
            config: Arc::new(config),
        }
    }

    /// Execute a request, returning its event stream immediately.
    pub fn execute(&self, request: SceneRequest) -> SceneStream {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancellation = CancellationToken::new();
        let manager = self.clone();
        let task_cancellation = cancellation.clone();

        tokio::spawn(async move {
            let mut ctx = RunContext::new(
                tx,
                task_cancellation,
                request.history.clone(),
                request.budget,
            );
            if let Err(e) = manager.run_request(&request, &mut ctx).await
                && !e.is_cancelled()
            {
                let _ = ctx.emit(AiResponse::failure(e, ctx.usage)).await;
            }
        });

        SceneStream {
            receiver: rx,
            cancellation,
        }
    }

    /// Resume an execution suspended on a client-side tool.
    ///
    /// The token is consumed whether or not resumption succeeds; a
    /// second resume with the same token reports it as unknown.
    pub fn resume(&self, token: ContinuationToken, outcome: ClientToolOutcome) -> SceneStream {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancellation = CancellationToken::new();
        let manager = self.clone();
        let task_cancellation = cancellation.clone();

        tokio::spawn(async move {
            let mut ctx = RunContext::new(
                tx,
                task_cancellation,
                Default::default(),
                Default::default(),
            );
            if let Err(e) = manager.run_resume(token, outcome, &mut ctx).await
                && !e.is_cancelled()
            {
                let _ = ctx.emit(AiResponse::failure(e, ctx.usage)).await;
            }
        });

        SceneStream {
            receiver: rx,
            cancellation,
        }
    }

    async fn run_request(
        &self,
        request: &SceneRequest,
        ctx: &mut RunContext,
    ) -> Result<(), EngineError> {
        ctx.emit_status(AiResponseStatus::Initializing).await?;

        let scene = self
            .registry
            .best_match(&request.input)
            .ok_or_else(|| {
                EngineError::NonTransientProvider("No scenes registered".to_string())
            })?
            .clone();
        let behavior = scene.cache_behavior.unwrap_or(self.config.cache.behavior);
        let mode = request
            .mode_override
            .unwrap_or(self.config.execution.default_mode);
        let result_key = self
            .cache
            .result_key(&scene.name, mode, &request.input, &request.history);
        tracing::info!(scene = %scene.name, %mode, "Scene selected");

        ctx.emit_status(AiResponseStatus::LoadingCache).await?;
        match self.cache.load_result(behavior, &result_key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %result_key, "Cache hit");
                ctx.emit(AiResponse::final_text(cached, ctx.usage)).await?;
                ctx.emit_status(AiResponseStatus::Completed).await?;
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Cache read failed, executing anyway"),
        }

        ctx.emit_status(AiResponseStatus::ExecutingMainActors).await?;
        ctx.conversation.push(Message::user(request.input.clone()));

        let plan: Vec<String> = match mode {
            ExecutionMode::Direct | ExecutionMode::DynamicChaining => vec![scene.name.clone()],
            ExecutionMode::Planning => {
                ctx.emit_status(AiResponseStatus::Planning).await?;
                match self
                    .planner
                    .build_plan(
                        &request.input,
                        &self.registry,
                        self.config.execution.max_recursion_depth,
                    )
                    .await
                {
                    Ok(plan) => plan.steps().to_vec(),
                    Err(EngineError::PlanningFailure(reason)) => {
                        tracing::warn!(%reason, "Planning failed, running best-match scene");
                        vec![scene.name.clone()]
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let run = SequenceRun {
            input: request.input.clone(),
            mode,
            re_executions: 0,
            behavior,
            result_key,
        };
        self.run_scene_sequence(plan, run, ctx).await
    }

    async fn run_resume(
        &self,
        token: ContinuationToken,
        outcome: ClientToolOutcome,
        ctx: &mut RunContext,
    ) -> Result<(), EngineError> {
        ctx.emit_status(AiResponseStatus::Initializing).await?;

        let state = self
            .cache
            .take_continuation(&token)
            .await
            .map_err(|e| EngineError::TransientProvider(format!("continuation store: {e}")))?
            .ok_or(EngineError::ContinuationNotFound)?;

        if state.is_expired(chrono::Utc::now().timestamp_millis()) {
            return Err(EngineError::ContinuationExpired);
        }

        ctx.conversation = state.conversation;
        ctx.usage = state.usage;
        ctx.budget = state.budget;
        ctx.check_budget()?;

        let tool_name = state.pending_call.tool_name.clone();
        ctx.conversation
            .push(Message::tool(outcome.as_tool_message(&tool_name)));
        let rendered = match &outcome {
            ClientToolOutcome::Success { output } => output.clone(),
            ClientToolOutcome::Error { message } => format!("error: {message}"),
        };
        ctx.emit(AiResponse::tool_completed(tool_name, rendered, ctx.usage))
            .await?;

        // The original request input is the first user turn of the
        // restored conversation; the director needs it for chaining.
        let input = ctx
            .conversation
            .messages()
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let mut plan = vec![state.scene_name];
        plan.extend(state.remaining_plan);

        let run = SequenceRun {
            input,
            mode: state.mode,
            re_executions: state.re_executions,
            behavior: state.cache_behavior,
            result_key: state.result_cache_key,
        };
        self.run_scene_sequence(plan, run, ctx).await
    }

    /// Run a plan of scenes to completion, suspension, or failure.
    ///
    /// Shared by fresh executions and resumptions; dynamic chaining
    /// re-queues the last scene while the director approves.
    async fn run_scene_sequence(
        &self,
        plan: Vec<String>,
        mut run: SequenceRun,
        ctx: &mut RunContext,
    ) -> Result<(), EngineError> {
        let mut queue: VecDeque<String> = plan.into();
        let mut final_text = String::new();

        while let Some(scene_name) = queue.pop_front() {
            let scene = self
                .registry
                .get(&scene_name)
                .ok_or_else(|| {
                    EngineError::NonTransientProvider(format!("Unknown scene '{scene_name}'"))
                })?
                .clone();

            ctx.emit_status(AiResponseStatus::ExecutingScene).await?;
            match self.executor.run(&scene, ctx).await? {
                SceneOutcome::Finished { text } => final_text = text,
                SceneOutcome::Suspended {
                    pending,
                    timeout_seconds,
                } => {
                    return self
                        .suspend(scene_name, pending, timeout_seconds, queue.into(), run, ctx)
                        .await;
                }
            }

            if self.summarizer.needs_summary(&ctx.conversation) {
                ctx.emit_status(AiResponseStatus::Summarizing).await?;
                self.summarizer.compact_if_needed(&mut ctx.conversation).await;
            }

            if run.mode == ExecutionMode::DynamicChaining
                && queue.is_empty()
                && run.re_executions < self.config.execution.max_re_executions
            {
                let verdict = self.director.should_continue(&run.input, &final_text).await;
                ctx.emit_status(AiResponseStatus::DirectorDecision).await?;
                if verdict {
                    run.re_executions += 1;
                    queue.push_back(scene_name);
                }
            }
        }

        ctx.emit(AiResponse::final_text(final_text.clone(), ctx.usage))
            .await?;
        ctx.emit_status(AiResponseStatus::SavingCache).await?;
        if let Err(e) = self
            .cache
            .save_result(run.behavior, &run.result_key, &final_text)
            .await
        {
            tracing::warn!(error = %e, "Cache write failed");
        }
        ctx.emit_status(AiResponseStatus::Completed).await?;
        Ok(())
    }

    /// Persist the suspension, hand the token to the caller, then watch
    /// for expiry.
    ///
    /// The watchdog sleeps until the deadline and then tries to consume
    /// the token itself: still present means nobody resumed and the
    /// expiry is reported on this stream; already gone means a resume
    /// took over and this stream closes quietly.
    async fn suspend(
        &self,
        scene_name: String,
        pending: PendingToolCall,
        timeout_seconds: u64,
        remaining_plan: Vec<String>,
        run: SequenceRun,
        ctx: &mut RunContext,
    ) -> Result<(), EngineError> {
        let token = ContinuationToken::generate();
        let now_ms = chrono::Utc::now().timestamp_millis();
        let state = ContinuationState {
            token: token.clone(),
            scene_name,
            pending_call: pending.clone(),
            timeout_seconds,
            expires_at_ms: now_ms + timeout_seconds as i64 * 1000,
            conversation: ctx.conversation.clone(),
            remaining_plan,
            mode: run.mode,
            re_executions: run.re_executions,
            usage: ctx.usage,
            budget: ctx.budget,
            cache_behavior: run.behavior,
            result_cache_key: run.result_key,
        };
        self.cache
            .put_continuation(&state)
            .await
            .map_err(|e| EngineError::TransientProvider(format!("continuation store: {e}")))?;

        tracing::info!(token = %token, tool = %pending.tool_name, "Awaiting client tool");
        ctx.emit(AiResponse::awaiting_client(
            token.clone(),
            pending.tool_name,
            pending.arguments,
            timeout_seconds,
            ctx.usage,
        ))
        .await?;

        tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(EngineError::Cancelled),
            _ = tokio::time::sleep(Duration::from_secs(timeout_seconds)) => {}
        }

        match self.cache.take_continuation(&token).await {
            // Still there: nobody resumed in time.
            Ok(Some(_)) => Err(EngineError::ContinuationExpired),
            // Consumed by a resume; that stream carries the rest.
            Ok(None) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Continuation expiry check failed");
                Ok(())
            }
        }
    }
}

// -- Tests --------------------------------------------------------------
