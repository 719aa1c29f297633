//! State shared across one request's execution.

use stagecraft_domain::{AiResponse, BudgetLimits, Conversation, EngineError, TokenUsage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Mutable state threaded through one execution: the event channel back
/// to the caller, the working conversation, and the running usage
/// measured against the request budget.
pub struct RunContext {
    events: mpsc::Sender<AiResponse>,
    pub cancellation: CancellationToken,
    pub conversation: Conversation,
    pub usage: TokenUsage,
    pub budget: BudgetLimits,
}

impl RunContext {
    pub fn new(
        events: mpsc::Sender<AiResponse>,
        cancellation: CancellationToken,
        conversation: Conversation,
        budget: BudgetLimits,
    ) -> Self {
        Self {
            events,
            cancellation,
            conversation,
            usage: TokenUsage::default(),
            budget,
        }
    }

    /// Emit one response event.
    ///
    /// A closed channel means the caller dropped the stream, which ends
    /// the run the same way an explicit cancellation does.
    pub async fn emit(&self, event: AiResponse) -> Result<(), EngineError> {
        self.events
            .send(event)
            .await
            .map_err(|_| EngineError::Cancelled)
    }

    /// Status-only event with the current cumulative usage attached
    pub async fn emit_status(
        &self,
        status: stagecraft_domain::AiResponseStatus,
    ) -> Result<(), EngineError> {
        self.emit(AiResponse::status(status, self.usage)).await
    }

    pub fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancellation.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Accumulate usage and fail if it breaches the budget.
    pub fn add_usage(&mut self, usage: &TokenUsage) -> Result<(), EngineError> {
        self.usage.add(usage);
        self.check_budget()
    }

    pub fn check_budget(&self) -> Result<(), EngineError> {
        if let Some(reason) = self.budget.breached_by(&self.usage) {
            Err(EngineError::BudgetExceeded(reason))
        } else {
            Ok(())
        }
    }
}
