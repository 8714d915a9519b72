use std::time::Duration;

use async_trait::async_trait;

use crate::models::Message;

/// What the bundled stub answers with, until a real completion backend is
/// plugged in.
pub const SIMULATED_REPLY: &str = "This is a simulated response. To connect real AI, \
you'll need to integrate with an API service like OpenAI, Claude, or use n8n workflows \
as mentioned in your requirements.";

/// Latency of the bundled stub, standing in for a real inference call.
pub const SIMULATED_REPLY_LATENCY: Duration = Duration::from_millis(2000);

/// Produces the assistant's answer for a conversation history. Swapping in
/// a real completion backend happens here, without touching the dispatcher.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(&self, history: &[Message]) -> String;
}

/// Stub generator: a fixed answer after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedReply {
    latency: Duration,
}

impl SimulatedReply {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedReply {
    fn default() -> Self {
        Self::new(SIMULATED_REPLY_LATENCY)
    }
}

#[async_trait]
impl ReplyGenerator for SimulatedReply {
    async fn generate_reply(&self, _history: &[Message]) -> String {
        tokio::time::sleep(self.latency).await;
        SIMULATED_REPLY.to_string()
    }
}
