//! Dynamic chaining: after each scene run, ask a model whether another
//! pass would improve the answer.

use crate::resilience::ChatClientPool;
use stagecraft_domain::Message;
use std::sync::Arc;

const DIRECTOR_PROMPT: &str = "You are reviewing an assistant's work. Given the user's request \
and the current answer, decide whether another execution pass would \
meaningfully improve the result. Answer with exactly one word: \
CONTINUE or STOP.";

/// Decides whether a dynamically-chained execution keeps going.
pub struct Director {
    pool: Arc<ChatClientPool>,
}

impl Director {
    pub fn new(pool: Arc<ChatClientPool>) -> Self {
        Self { pool }
    }

    /// Whether to run the scene again. Fails safe: any provider error
    /// or unparseable answer reads as stop.
    pub async fn should_continue(&self, input: &str, current_output: &str) -> bool {
        let messages = [
            Message::system(DIRECTOR_PROMPT),
            Message::user(format!(
                "Request:\n{input}\n\nCurrent answer:\n{current_output}"
            )),
        ];

        match self.pool.send(&messages, &[]).await {
            Ok(reply) => parse_verdict(&reply.reply.text_content()),
            Err(e) => {
                tracing::warn!(error = %e, "Director unavailable, stopping chain");
                false
            }
        }
    }
}

fn parse_verdict(text: &str) -> bool {
    let upper = text.to_uppercase();
    // CONTINUE wins only when STOP is absent, so a hedging answer
    // mentioning both stops the chain.
    upper.contains("CONTINUE") && !upper.contains("STOP")
}
