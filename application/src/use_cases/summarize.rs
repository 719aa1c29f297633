//! Conversation summarization.
//!
//! Long histories are compacted between scene executions: everything
//! but the most recent turns is replaced by a model-written summary.
//! Summarization is an optimization, so a failing provider leaves the
//! conversation untouched rather than failing the run.

use crate::config::SummarizeConfig;
use crate::resilience::ChatClientPool;
use stagecraft_domain::{Conversation, Message};
use std::sync::Arc;

const SUMMARIZER_PROMPT: &str = "Summarize the following conversation in a few sentences, keeping \
every fact, decision and open request. Answer with the summary only.";

pub struct Summarizer {
    pool: Arc<ChatClientPool>,
    config: SummarizeConfig,
}

impl Summarizer {
    pub fn new(pool: Arc<ChatClientPool>, config: SummarizeConfig) -> Self {
        Self { pool, config }
    }

    /// Whether the conversation has outgrown either threshold
    pub fn needs_summary(&self, conversation: &Conversation) -> bool {
        conversation.char_count() > self.config.character_threshold
            || conversation.response_count() > self.config.response_count_threshold
    }

    /// Compact the conversation if it needs it. Returns whether the
    /// history was actually rewritten.
    pub async fn compact_if_needed(&self, conversation: &mut Conversation) -> bool {
        if !self.needs_summary(conversation) {
            return false;
        }
        if conversation.len() <= self.config.keep_recent_turns {
            return false;
        }

        let head = &conversation.messages()
            [..conversation.len() - self.config.keep_recent_turns];
        let transcript = head
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = [Message::system(SUMMARIZER_PROMPT), Message::user(transcript)];

        match self.pool.send(&messages, &[]).await {
            Ok(reply) => {
                let summary = reply.reply.text_content();
                if summary.trim().is_empty() {
                    return false;
                }
                conversation.compact(summary, self.config.keep_recent_turns);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Summarization failed, keeping full history");
                false
            }
        }
    }
}
