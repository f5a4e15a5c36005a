#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use hextech::config::Timings;
use hextech::kernel::event::{Command, Event, ProviderRequest, SideEffect};
use hextech::kernel::log::{LogRole, PipelineLogEntry};
use hextech::kernel::state::{AiState, GameContext, Mode};
use hextech::kernel::time::Timestamp;
use hextech::services::llm::{CannedProvider, ProviderError, ResponseProvider};
use hextech::Reactor;

/// Always answers with the same text.
pub struct FixedProvider(pub String);

#[async_trait]
impl ResponseProvider for FixedProvider {
    async fn generate(&self, _query: &str, _context: GameContext) -> Result<String, ProviderError> {
        Ok(self.0.clone())
    }
}

pub struct FailingProvider;

#[async_trait]
impl ResponseProvider for FailingProvider {
    async fn generate(&self, _query: &str, _context: GameContext) -> Result<String, ProviderError> {
        Err(ProviderError::Status(503))
    }
}

pub struct EmptyProvider;

#[async_trait]
impl ResponseProvider for EmptyProvider {
    async fn generate(&self, _query: &str, _context: GameContext) -> Result<String, ProviderError> {
        Ok(String::new())
    }
}

struct PendingReply {
    due: Timestamp,
    generation: u64,
    reply: Result<String, ProviderError>,
}

/// Drives a reactor through virtual time, standing in for the runtime driver.
/// Provider requests are answered `latency_ms` after they are made.
pub struct Harness {
    pub reactor: Reactor,
    provider: Arc<dyn ResponseProvider>,
    latency_ms: u64,
    pending: Vec<PendingReply>,
    pub requests: Vec<ProviderRequest>,
    pub completed: Vec<(u64, String)>,
}

impl Harness {
    pub fn new(provider: impl ResponseProvider + 'static) -> Self {
        Self {
            reactor: Reactor::new(Timings::default()),
            provider: Arc::new(provider),
            latency_ms: 0,
            pending: Vec::new(),
            requests: Vec::new(),
            completed: Vec::new(),
        }
    }

    pub fn canned() -> Self {
        Self::new(CannedProvider::new())
    }

    pub fn fixed(text: &str) -> Self {
        Self::new(FixedProvider(text.to_string()))
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn now(&self) -> u64 {
        self.reactor.now().ms
    }

    pub fn ai(&self) -> &AiState {
        self.reactor.ai()
    }

    /// Apply a command at the current virtual time.
    pub async fn command(&mut self, command: Command) {
        let now = self.reactor.now();
        let effects = self.reactor.tick_step(now, vec![Event::Command(command)]);
        self.absorb(effects).await;
    }

    pub async fn set_mode(&mut self, mode: Mode) {
        self.command(Command::SetMode(mode)).await;
    }

    pub async fn say(&mut self, text: &str) {
        self.command(Command::SendMessage(text.to_string())).await;
    }

    pub async fn voice(&mut self, active: bool) {
        self.command(Command::TriggerVoice(active)).await;
    }

    pub async fn toggle_duplex(&mut self) {
        self.command(Command::ToggleDuplex).await;
    }

    pub async fn interrupt(&mut self) -> bool {
        let accepted = self.reactor.interrupt();
        let effects = self.reactor.flush();
        self.absorb(effects).await;
        accepted
    }

    /// Run every timer and provider reply due up to and including `ms`.
    pub async fn run_until(&mut self, ms: u64) {
        let target = Timestamp::new(ms);
        loop {
            let next_timer = self.reactor.next_due();
            let next_reply = self.pending.iter().map(|p| p.due).min();
            let next = match (next_timer, next_reply) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => break,
            };
            if next > target {
                break;
            }

            let mut events = Vec::new();
            let mut i = 0;
            while i < self.pending.len() {
                if self.pending[i].due <= next {
                    let p = self.pending.remove(i);
                    events.push(Event::ProviderReplied { generation: p.generation, reply: p.reply });
                } else {
                    i += 1;
                }
            }
            let effects = self.reactor.tick_step(next, events);
            self.absorb(effects).await;
        }
        let effects = self.reactor.tick_step(target, Vec::new());
        self.absorb(effects).await;
    }

    pub async fn advance(&mut self, ms: u64) {
        let until = self.now() + ms;
        self.run_until(until).await;
    }

    async fn absorb(&mut self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::RequestResponse(request) => {
                    let reply = self.provider.generate(&request.query, request.context).await;
                    self.pending.push(PendingReply {
                        due: self.reactor.now().plus(self.latency_ms),
                        generation: request.generation,
                        reply,
                    });
                    self.requests.push(request);
                }
                SideEffect::SessionCompleted { generation, response } => {
                    self.completed.push((generation, response));
                }
            }
        }
    }

    pub fn logs(&self) -> Vec<PipelineLogEntry> {
        self.reactor.state().log().to_vec()
    }

    pub fn roles(&self) -> Vec<LogRole> {
        self.reactor.state().log().entries().map(|e| e.role).collect()
    }

    pub fn contents(&self) -> Vec<String> {
        self.reactor.state().log().entries().map(|e| e.content.clone()).collect()
    }

    /// Millisecond stamps of entries whose content equals `content`.
    pub fn stamps_of(&self, content: &str) -> Vec<u64> {
        self.reactor
            .state()
            .log()
            .entries()
            .filter(|e| e.content == content)
            .map(|e| e.timestamp.ms)
            .collect()
    }

    pub fn log_len(&self) -> usize {
        self.reactor.state().log().len()
    }
}
