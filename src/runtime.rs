use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::HextechConfig;
use crate::kernel::event::{Command, Event, ProviderRequest, SideEffect};
use crate::kernel::reactor::Reactor;
use crate::kernel::time::Timestamp;
use crate::services::llm::{ProviderError, ResponseProvider};

/// Async shell around the reactor.
///
/// Owns the reactor on one task, maps wall time onto its virtual clock, and
/// performs the side effects it asks for. Provider calls run on their own
/// tasks and come back as events on the next tick.
pub struct Driver {
    reactor: Reactor,
    provider: Arc<dyn ResponseProvider>,
    commands: mpsc::Receiver<Command>,
    replies_tx: mpsc::UnboundedSender<Event>,
    replies_rx: mpsc::UnboundedReceiver<Event>,
    tick: Duration,
    request_timeout_ms: u64,
}

impl Driver {
    pub fn new(
        reactor: Reactor,
        provider: Arc<dyn ResponseProvider>,
        commands: mpsc::Receiver<Command>,
        config: &HextechConfig,
    ) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            reactor,
            provider,
            commands,
            replies_tx,
            replies_rx,
            tick: Duration::from_millis(config.runtime.tick_ms.max(1)),
            request_timeout_ms: config.provider.timeout_ms,
        }
    }

    /// Runs until `shutdown` fires or every command sender is gone, then
    /// hands the reactor back.
    pub async fn run(mut self, shutdown: CancellationToken) -> Reactor {
        info!(tick_ms = self.tick.as_millis() as u64, "driver started");
        let started = Instant::now();
        let mut cadence = interval(self.tick);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let mut events = Vec::new();
            let mut closed = false;
            loop {
                match self.commands.try_recv() {
                    Ok(command) => events.push(Event::Command(command)),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                }
            }
            while let Ok(event) = self.replies_rx.try_recv() {
                events.push(event);
            }

            let now = Timestamp::new(started.elapsed().as_millis() as u64);
            for effect in self.reactor.tick_step(now, events) {
                self.execute(effect);
            }

            if closed {
                info!("command channel closed");
                break;
            }
        }

        info!("driver stopped");
        self.reactor
    }

    fn execute(&self, effect: SideEffect) {
        match effect {
            SideEffect::RequestResponse(request) => self.spawn_request(request),
            SideEffect::SessionCompleted { generation, response } => {
                info!(generation, %response, "session completed");
            }
        }
    }

    fn spawn_request(&self, request: ProviderRequest) {
        let provider = Arc::clone(&self.provider);
        let replies = self.replies_tx.clone();
        let limit = self.request_timeout_ms;
        debug!(generation = request.generation, query = %request.query, "provider request");

        tokio::spawn(async move {
            let call = provider.generate(&request.query, request.context);
            let reply = match tokio::time::timeout(Duration::from_millis(limit), call).await {
                Ok(reply) => reply,
                Err(_) => Err(ProviderError::Timeout(limit)),
            };
            // The driver may already be gone.
            let _ = replies.send(Event::ProviderReplied { generation: request.generation, reply });
        });
    }
}

/// Wait for a helper task and log how it ended. Returns whether it finished
/// cleanly.
pub async fn join_logged(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task = name, error = %e, "task failed");
            false
        }
    }
}
