//! Single-scene execution.
//!
//! Runs the model↔tool turn loop for one scene: send the conversation
//! with the scene's tools attached, execute requested actors
//! server-side, feed results back, repeat until the model answers in
//! plain text or a client-side tool suspends the run.

use crate::config::ExecutionConfig;
use crate::ports::{ActorExecutorPort, ToolDescriptor};
use crate::resilience::ChatClientPool;
use crate::use_cases::shared::RunContext;
use stagecraft_domain::{
    AiResponse, EngineError, Message, PendingToolCall, Scene, ToolCallRequest, ToolSchema,
};
use std::sync::Arc;
use std::time::Duration;

/// How one scene execution ended
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOutcome {
    /// The model produced a plain-text answer
    Finished { text: String },
    /// A client-side tool was requested; the run must suspend
    Suspended {
        pending: PendingToolCall,
        timeout_seconds: u64,
    },
}

pub struct SceneExecutor {
    pool: Arc<ChatClientPool>,
    actors: Arc<dyn ActorExecutorPort>,
    config: ExecutionConfig,
}

impl SceneExecutor {
    pub fn new(
        pool: Arc<ChatClientPool>,
        actors: Arc<dyn ActorExecutorPort>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            pool,
            actors,
            config,
        }
    }

    /// Run the turn loop for `scene` against the context's conversation.
    ///
    /// Actor failures and timeouts skip the tool and keep going; only
    /// provider exhaustion, budget breaches and cancellation abort.
    pub async fn run(
        &self,
        scene: &Scene,
        ctx: &mut RunContext,
    ) -> Result<SceneOutcome, EngineError> {
        let tools = scene_tools(scene);

        for _turn in 0..self.config.max_tool_turns {
            ctx.check_cancelled()?;

            let reply = self.pool.send(ctx.conversation.messages(), &tools).await?;
            ctx.add_usage(&reply.usage)?;

            let text = reply.reply.text_content();
            let calls = reply.reply.tool_calls();

            if calls.is_empty() {
                ctx.conversation.push(Message::assistant(text.clone()));
                return Ok(SceneOutcome::Finished { text });
            }

            if !text.is_empty() {
                ctx.conversation.push(Message::assistant(text));
            }

            for call in calls {
                if let Some(interaction) = scene.client_interaction(&call.name) {
                    // Client tools never run here: snapshot and suspend.
                    return Ok(SceneOutcome::Suspended {
                        pending: PendingToolCall {
                            call_id: call.id,
                            tool_name: interaction.tool_name.clone(),
                            arguments: call.arguments,
                        },
                        timeout_seconds: interaction.timeout_seconds,
                    });
                }
                self.run_actor(scene, &call, ctx).await?;
            }
        }

        Err(EngineError::NonTransientProvider(format!(
            "Scene '{}' exceeded {} tool turns without a final answer",
            scene.name, self.config.max_tool_turns
        )))
    }

    async fn run_actor(
        &self,
        scene: &Scene,
        call: &ToolCallRequest,
        ctx: &mut RunContext,
    ) -> Result<(), EngineError> {
        if scene.actor(&call.name).is_none() {
            tracing::warn!(tool = %call.name, scene = %scene.name, "Unknown tool requested");
            ctx.emit(AiResponse::tool_skipped(call.name.clone(), ctx.usage))
                .await?;
            ctx.conversation
                .push(Message::tool(format!("[{}] unknown tool", call.name)));
            return Ok(());
        }

        ctx.emit(AiResponse::tool_request(call.name.clone(), ctx.usage))
            .await?;

        let timeout = Duration::from_secs(self.config.tool_timeout_seconds);
        let invocation = self.actors.invoke(&call.name, &call.arguments);
        match tokio::time::timeout(timeout, invocation).await {
            Ok(Ok(output)) => {
                ctx.emit(AiResponse::tool_completed(
                    call.name.clone(),
                    output.clone(),
                    ctx.usage,
                ))
                .await?;
                ctx.conversation
                    .push(Message::tool(format!("[{}] {}", call.name, output)));
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "Actor failed, skipping");
                ctx.emit(AiResponse::tool_skipped(call.name.clone(), ctx.usage))
                    .await?;
                ctx.conversation
                    .push(Message::tool(format!("[{}] unavailable: {}", call.name, e)));
            }
            Err(_) => {
                let timed_out = EngineError::ToolTimeout(call.name.clone());
                tracing::warn!(tool = %call.name, error = %timed_out, "Skipping actor");
                ctx.emit(AiResponse::tool_skipped(call.name.clone(), ctx.usage))
                    .await?;
                ctx.conversation
                    .push(Message::tool(format!("[{}] {}", call.name, timed_out)));
            }
        }
        Ok(())
    }
}

/// All of a scene's tools as provider descriptors: actors plus client
/// interactions, indistinguishable to the model.
fn scene_tools(scene: &Scene) -> Vec<ToolDescriptor> {
    let empty = ToolSchema::new();
    scene
        .actors
        .iter()
        .map(|a| ToolDescriptor::new(a.name.clone(), a.description.clone(), &a.schema))
        .chain(scene.client_interactions.iter().map(|c| {
            ToolDescriptor::new(
                c.tool_name.clone(),
                c.description.clone(),
                c.arguments_schema.as_ref().unwrap_or(&empty),
            )
        }))
        .collect()
}

// -- Tests --------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::ports::{ActorError, ChatProviderPort, ProviderError};
    use async_trait::async_trait;
    use stagecraft_domain::{
        ActorDefinition, AiResponseStatus, BudgetLimits, ClientInteractionDefinition, ContentBlock,
        Conversation, ProviderReply, Role,
    };
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct ScriptedProvider {
        replies: Mutex<VecDeque<ProviderReply>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<ProviderReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl ChatProviderPort for ScriptedProvider {
        async fn send(
            &self,
            _messages: &[Message],
            _tools: &[ToolDescriptor],
        ) -> Result<ProviderReply, ProviderError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::NonTransient("script exhausted".into()))
        }
    }

    struct MapActors {
        results: HashMap<String, Result<String, String>>,
    }

    #[async_trait]
    impl ActorExecutorPort for MapActors {
        async fn invoke(
            &self,
            actor_name: &str,
            _arguments: &HashMap<String, serde_json::Value>,
        ) -> Result<String, ActorError> {
            match self.results.get(actor_name) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(message)) => Err(ActorError::Failed(
                    actor_name.to_string(),
                    message.clone(),
                )),
                None => Err(ActorError::NotFound(actor_name.to_string())),
            }
        }
    }

    fn tool_call_reply(name: &str) -> ProviderReply {
        ProviderReply {
            content: vec![ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: name.to_string(),
                input: HashMap::new(),
            }],
            usage: stagecraft_domain::TokenUsage::new(10, 5),
        }
    }

    fn scene() -> Scene {
        Scene::new("weather", "Weather lookups")
            .with_actor(ActorDefinition::new("get_forecast", "Forecast lookup").unwrap())
            .with_client_interaction(
                ClientInteractionDefinition::new("pick_city", "Ask the user for a city", 120)
                    .unwrap(),
            )
    }

    fn executor(
        replies: Vec<ProviderReply>,
        actors: HashMap<String, Result<String, String>>,
    ) -> SceneExecutor {
        let pool_config = PoolConfig {
            retry_base_delay_seconds: 0.0,
            ..PoolConfig::default()
        };
        let pool = ChatClientPool::new(&pool_config)
            .with_primary("scripted", Arc::new(ScriptedProvider::new(replies)));
        SceneExecutor::new(
            Arc::new(pool),
            Arc::new(MapActors { results: actors }),
            ExecutionConfig::default(),
        )
    }

    fn context(budget: BudgetLimits) -> (RunContext, mpsc::Receiver<AiResponse>) {
        let (tx, rx) = mpsc::channel(32);
        let mut conversation = Conversation::new();
        conversation.push(Message::user("weather in Osaka?"));
        let ctx = RunContext::new(tx, CancellationToken::new(), conversation, budget);
        (ctx, rx)
    }

    async fn drain(rx: &mut mpsc::Receiver<AiResponse>) -> Vec<AiResponseStatus> {
        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            statuses.push(event.status);
        }
        statuses
    }

    #[tokio::test]
    async fn plain_answer_finishes_in_one_turn() {
        let executor = executor(
            vec![ProviderReply::from_text("Sunny.").with_usage(10, 5)],
            HashMap::new(),
        );
        let (mut ctx, _rx) = context(BudgetLimits::unlimited());

        let outcome = executor.run(&scene(), &mut ctx).await.unwrap();
        assert_eq!(
            outcome,
            SceneOutcome::Finished {
                text: "Sunny.".to_string()
            }
        );
        assert_eq!(ctx.conversation.messages().last().unwrap().role, Role::Assistant);
        assert_eq!(ctx.usage.total_tokens(), 15);
    }

    #[tokio::test]
    async fn actor_call_round_trips_through_the_conversation() {
        let executor = executor(
            vec![
                tool_call_reply("get_forecast"),
                ProviderReply::from_text("Rain tomorrow.").with_usage(10, 5),
            ],
            HashMap::from([("get_forecast".to_string(), Ok("rain, 80%".to_string()))]),
        );
        let (mut ctx, mut rx) = context(BudgetLimits::unlimited());

        let outcome = executor.run(&scene(), &mut ctx).await.unwrap();
        assert_eq!(
            outcome,
            SceneOutcome::Finished {
                text: "Rain tomorrow.".to_string()
            }
        );
        assert_eq!(
            drain(&mut rx).await,
            [
                AiResponseStatus::FunctionRequest,
                AiResponseStatus::FunctionCompleted
            ]
        );
        let tool_turn = ctx
            .conversation
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert_eq!(tool_turn.content, "[get_forecast] rain, 80%");
    }

    #[tokio::test]
    async fn failing_actor_is_skipped_not_fatal() {
        let executor = executor(
            vec![
                tool_call_reply("get_forecast"),
                ProviderReply::from_text("Could not check, sorry.").with_usage(10, 5),
            ],
            HashMap::from([("get_forecast".to_string(), Err("backend down".to_string()))]),
        );
        let (mut ctx, mut rx) = context(BudgetLimits::unlimited());

        let outcome = executor.run(&scene(), &mut ctx).await.unwrap();
        assert!(matches!(outcome, SceneOutcome::Finished { .. }));
        assert_eq!(
            drain(&mut rx).await,
            [
                AiResponseStatus::FunctionRequest,
                AiResponseStatus::ToolSkipped
            ]
        );
    }

    struct SleepyActors;

    #[async_trait]
    impl ActorExecutorPort for SleepyActors {
        async fn invoke(
            &self,
            _actor_name: &str,
            _arguments: &HashMap<String, serde_json::Value>,
        ) -> Result<String, ActorError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_actor_is_skipped_after_the_timeout() {
        let pool_config = PoolConfig {
            retry_base_delay_seconds: 0.0,
            ..PoolConfig::default()
        };
        let pool = ChatClientPool::new(&pool_config).with_primary(
            "scripted",
            Arc::new(ScriptedProvider::new(vec![
                tool_call_reply("get_forecast"),
                ProviderReply::from_text("No forecast available.").with_usage(10, 5),
            ])),
        );
        let executor = SceneExecutor::new(
            Arc::new(pool),
            Arc::new(SleepyActors),
            ExecutionConfig::default(),
        );
        let (mut ctx, mut rx) = context(BudgetLimits::unlimited());

        let outcome = executor.run(&scene(), &mut ctx).await.unwrap();
        assert!(matches!(outcome, SceneOutcome::Finished { .. }));
        assert_eq!(
            drain(&mut rx).await,
            [
                AiResponseStatus::FunctionRequest,
                AiResponseStatus::ToolSkipped
            ]
        );
        let tool_turn = ctx
            .conversation
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_turn.content.contains("timed out"));
    }

    #[tokio::test]
    async fn unknown_tool_is_skipped_without_invocation() {
        let executor = executor(
            vec![
                tool_call_reply("made_up_tool"),
                ProviderReply::from_text("Moving on.").with_usage(10, 5),
            ],
            HashMap::new(),
        );
        let (mut ctx, mut rx) = context(BudgetLimits::unlimited());

        executor.run(&scene(), &mut ctx).await.unwrap();
        assert_eq!(drain(&mut rx).await, [AiResponseStatus::ToolSkipped]);
    }

    #[tokio::test]
    async fn client_interaction_suspends_immediately() {
        let executor = executor(vec![tool_call_reply("pick_city")], HashMap::new());
        let (mut ctx, _rx) = context(BudgetLimits::unlimited());

        let outcome = executor.run(&scene(), &mut ctx).await.unwrap();
        match outcome {
            SceneOutcome::Suspended {
                pending,
                timeout_seconds,
            } => {
                assert_eq!(pending.tool_name, "pick_city");
                assert_eq!(pending.call_id, "call_1");
                assert_eq!(timeout_seconds, 120);
            }
            other => panic!("expected suspension, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn endless_tool_requests_hit_the_turn_limit() {
        let replies = (0..20).map(|_| tool_call_reply("get_forecast")).collect();
        let executor = executor(
            replies,
            HashMap::from([("get_forecast".to_string(), Ok("rain".to_string()))]),
        );
        let (mut ctx, _rx) = context(BudgetLimits::unlimited());

        let err = executor.run(&scene(), &mut ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::NonTransientProvider(_)));
    }

    #[tokio::test]
    async fn budget_breach_aborts_the_scene() {
        let executor = executor(
            vec![
                tool_call_reply("get_forecast"),
                ProviderReply::from_text("done").with_usage(10, 5),
            ],
            HashMap::from([("get_forecast".to_string(), Ok("rain".to_string()))]),
        );
        let (mut ctx, _rx) = context(BudgetLimits::unlimited().with_max_tokens(5));

        let err = executor.run(&scene(), &mut ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::BudgetExceeded(_)));
    }
}
