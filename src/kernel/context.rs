use super::event::{ProviderRequest, SideEffect};
use super::log::LogRole;
use super::scheduler::{Scheduler, TimerToken};
use super::state::{SharedState, StateDelta};
use super::time::Timestamp;
use crate::config::Timings;

/// Pipeline stages a run resumes at after a scheduled delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStage {
    Vad,
    Nlp,
    LlmRequest,
    /// Waiting on the provider; resumed by a reply, not a timer.
    AwaitingReply,
    LlmResult,
    TtsStart,
    TtsReady,
    /// Reply is playing; resumed by the end-of-speech timeout.
    SpeechEnd,
}

/// Resume points of one proactive duplex cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    Trigger,
    AiLine,
    AiLineDone,
    FollowUp,
    Reply,
    ReplyDone,
}

/// Scheduled work. Every variant carries the generation or epoch it was
/// scheduled under, checked before it may touch state.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Pipeline { generation: u64, stage: SessionStage },
    ListeningTick,
    Duplex { epoch: u64, phase: CyclePhase },
    BargeIn { epoch: u64 },
}

/// Resources shared by the orchestrator components: observable state, the
/// timer queue, latencies, and side effects waiting for the driver.
#[derive(Debug)]
pub struct Context {
    pub state: SharedState,
    pub scheduler: Scheduler<Step>,
    pub timings: Timings,
    effects: Vec<SideEffect>,
}

impl Context {
    pub fn new(timings: Timings) -> Self {
        Self {
            state: SharedState::new(),
            scheduler: Scheduler::new(),
            timings,
            effects: Vec::new(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    pub fn log(&mut self, role: LogRole, content: impl Into<String>) {
        let now = self.now();
        self.state.push_log(role, content, now);
    }

    pub fn reduce(&mut self, delta: StateDelta) {
        self.state.reduce(delta);
    }

    pub fn after(&mut self, delay_ms: u64, step: Step) -> TimerToken {
        self.scheduler.after(delay_ms, step)
    }

    pub fn request(&mut self, request: ProviderRequest) {
        self.effects.push(SideEffect::RequestResponse(request));
    }

    pub fn emit(&mut self, effect: SideEffect) {
        self.effects.push(effect);
    }

    pub fn take_effects(&mut self) -> Vec<SideEffect> {
        std::mem::take(&mut self.effects)
    }
}
