use tokio::sync::watch;
use tracing::{debug, info};

use super::chat::Sender;
use super::context::{Context, Step};
use super::duplex::DuplexLoop;
use super::event::{Command, Event, SideEffect};
use super::fixtures::{
    copy, AI_MENTION, BARGE_IN_QUERY, EMPTY_MENTION_QUERY, FOLLOW_UP_QUERY, PUSH_TO_TALK_QUERY,
};
use super::interrupt::InterruptHandler;
use super::listening::ListeningWindow;
use super::log::LogRole;
use super::scheduler::Fired;
use super::session::{PipelineSession, Progress};
use super::state::{AiState, GameContext, Mode, SharedState, Snapshot, StateDelta};
use super::time::Timestamp;
use crate::config::Timings;
use crate::services::llm::ProviderError;

/// The orchestrator core.
///
/// A plain `&mut self` state machine: commands and provider replies go in,
/// side effects come out, and time only moves when the driver says so.
/// Nothing here awaits.
pub struct Reactor {
    ctx: Context,
    session: PipelineSession,
    listening: ListeningWindow,
    duplex: DuplexLoop,
    interrupt: InterruptHandler,
    observers: watch::Sender<Snapshot>,
    published_version: Option<u64>,
}

impl Reactor {
    pub fn new(timings: Timings) -> Self {
        let ctx = Context::new(timings);
        let (observers, _) = watch::channel(ctx.state.snapshot(ctx.now()));
        Self {
            ctx,
            session: PipelineSession::new(),
            listening: ListeningWindow::new(),
            duplex: DuplexLoop::new(),
            interrupt: InterruptHandler::new(),
            observers,
            published_version: None,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.ctx.now()
    }

    /// Receives a fresh snapshot after every command or step that changed
    /// observable state.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.observers.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.ctx.state.snapshot(self.ctx.now())
    }

    pub fn state(&self) -> &SharedState {
        &self.ctx.state
    }

    pub fn ai(&self) -> &AiState {
        self.ctx.state.ai()
    }

    pub fn mode(&self) -> Mode {
        self.ctx.state.mode
    }

    pub fn duplex_active(&self) -> bool {
        self.ctx.state.duplex_active
    }

    pub fn session(&self) -> &PipelineSession {
        &self.session
    }

    pub fn duplex(&self) -> &DuplexLoop {
        &self.duplex
    }

    pub fn listening(&self) -> &ListeningWindow {
        &self.listening
    }

    /// Due time of the earliest scheduled step, if any.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.ctx.scheduler.next_due()
    }

    /// One driver step. Time advances first, firing every step due by `now`,
    /// then the events are applied in arrival order.
    pub fn tick_step(&mut self, now: Timestamp, events: Vec<Event>) -> Vec<SideEffect> {
        self.advance_to(now);
        for event in events {
            self.handle(event);
        }
        self.flush()
    }

    /// Fire due steps one at a time in (due, insertion) order, publishing
    /// after each, then move the clock to `now`.
    pub fn advance_to(&mut self, now: Timestamp) {
        while let Some(fired) = self.ctx.scheduler.pop_due(now) {
            self.run_step(fired);
            self.publish();
        }
        self.ctx.scheduler.advance_to(now);
        self.publish();
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Command(command) => self.dispatch(command),
            Event::ProviderReplied { generation, reply } => self.provider_replied(generation, reply),
        }
        self.publish();
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::SetMode(mode) => self.set_mode(mode),
            Command::SetGameContext(context) => self.set_game_context(context),
            Command::SendMessage(text) => self.send_message(&text),
            Command::TriggerVoice(active) => self.trigger_voice(active),
            Command::ToggleDuplex => self.toggle_duplex(),
            Command::Interrupt => {
                self.interrupt();
            }
        }
    }

    /// Drain side effects produced since the last call.
    pub fn flush(&mut self) -> Vec<SideEffect> {
        self.publish();
        self.ctx.take_effects()
    }

    /// Atomic reset: nothing scheduled under the old mode survives.
    pub fn set_mode(&mut self, mode: Mode) {
        self.ctx.scheduler.cancel_all();
        self.session.invalidate(&mut self.ctx);
        self.listening.reset();
        self.duplex.reset();
        self.interrupt.reset();
        self.ctx.state.reset_for_mode(mode);
        info!(?mode, "mode switched");
    }

    pub fn set_game_context(&mut self, context: GameContext) {
        if self.ctx.state.game_context == context {
            return;
        }
        self.ctx.state.set_game_context(context);
        info!(context = context.tag(), "game context changed");
    }

    pub fn send_message(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            debug!("blank message ignored");
            return;
        }
        if self.ctx.state.mode != Mode::TextChat {
            self.start_session(text);
            return;
        }

        let now = self.ctx.now();
        self.ctx.state.push_chat(Sender::Player, text, now);
        if let Some(query) = extract_mention(text) {
            let query = if query.is_empty() { EMPTY_MENTION_QUERY.to_string() } else { query };
            self.start_session(&query);
        }
    }

    pub fn trigger_voice(&mut self, active: bool) {
        match (self.ctx.state.mode, active) {
            (Mode::SingleTurnVoice, true) => {
                self.ctx.state.clear_log();
                self.session.invalidate(&mut self.ctx);
                self.ctx.reduce(StateDelta::CaptureStarted);
                self.ctx.log(LogRole::Asr, copy::CAPTURE_START);
            }
            (Mode::SingleTurnVoice, false) if self.ctx.state.ai().is_listening => {
                self.ctx.reduce(StateDelta::CaptureStopped);
                self.ctx.log(LogRole::System, copy::CAPTURE_STOP);
                self.start_session(PUSH_TO_TALK_QUERY);
            }
            (Mode::MultiTurnVoice, true) if self.listening.is_open() => {
                self.ctx.log(LogRole::UserAction, copy::WINDOW_FOLLOW_UP);
                self.start_session(FOLLOW_UP_QUERY);
            }
            (Mode::MultiTurnVoice, true) => self.listening.open(&mut self.ctx),
            (Mode::MultiTurnVoice, false) if self.listening.is_open() => {
                self.listening.close(&mut self.ctx)
            }
            (mode, active) => debug!(?mode, active, "voice trigger ignored"),
        }
    }

    pub fn toggle_duplex(&mut self) {
        if self.ctx.state.mode != Mode::FullDuplex {
            debug!(mode = ?self.ctx.state.mode, "duplex toggle ignored outside full-duplex");
            return;
        }
        if self.ctx.state.duplex_active {
            self.session.invalidate(&mut self.ctx);
            self.interrupt.cancel(&mut self.ctx);
            self.duplex.deactivate(&mut self.ctx);
        } else {
            self.duplex.activate(&mut self.ctx);
        }
    }

    /// Barge-in. Returns whether it was accepted.
    pub fn interrupt(&mut self) -> bool {
        self.interrupt.interrupt(&mut self.ctx, &mut self.session, &mut self.duplex)
    }

    /// Start a proactive cycle right away instead of waiting for the timer.
    pub fn trigger_proactive_cycle(&mut self) -> bool {
        let in_flight = self.session.in_flight();
        self.duplex.trigger(&mut self.ctx, in_flight)
    }

    pub fn provider_replied(&mut self, generation: u64, reply: Result<String, ProviderError>) {
        let progress = self.session.on_reply(&mut self.ctx, generation, reply);
        self.after_progress(progress);
    }

    fn start_session(&mut self, query: &str) -> u64 {
        if self.ctx.state.mode == Mode::FullDuplex && self.ctx.state.duplex_active {
            self.duplex.park(&mut self.ctx);
        }
        self.session.start(&mut self.ctx, query)
    }

    fn run_step(&mut self, fired: Fired<Step>) {
        match fired.task {
            Step::Pipeline { generation, stage } => {
                let progress = self.session.advance(&mut self.ctx, generation, stage);
                self.after_progress(progress);
            }
            Step::ListeningTick => self.listening.on_tick(&mut self.ctx, fired.token),
            Step::Duplex { epoch, phase } => {
                let in_flight = self.session.in_flight();
                self.duplex.on_step(&mut self.ctx, epoch, phase, in_flight);
            }
            Step::BargeIn { epoch } => {
                if self.interrupt.on_barge_in(&mut self.ctx, fired.token, epoch, &self.duplex) {
                    self.start_session(BARGE_IN_QUERY);
                }
            }
        }
    }

    fn after_progress(&mut self, progress: Progress) {
        if progress == Progress::Ended {
            self.duplex.resume(&mut self.ctx);
        }
    }

    fn publish(&mut self) {
        let version = self.ctx.state.version;
        if self.published_version == Some(version) {
            return;
        }
        self.published_version = Some(version);
        self.observers.send_replace(self.ctx.state.snapshot(self.ctx.now()));
    }
}

/// Strip every case-insensitive `@ai` from a chat line. `None` when the
/// assistant was not mentioned.
pub fn extract_mention(text: &str) -> Option<String> {
    let needle = AI_MENTION.as_bytes();
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut found = false;
    let mut start = 0;
    let mut i = 0;

    while i + needle.len() <= bytes.len() {
        if bytes[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            out.push_str(&text[start..i]);
            i += needle.len();
            start = i;
            found = true;
        } else {
            i += 1;
        }
    }
    if !found {
        return None;
    }
    out.push_str(&text[start..]);
    Some(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_are_stripped_case_insensitively() {
        assert_eq!(extract_mention("@AI 打野在哪"), Some("打野在哪".to_string()));
        assert_eq!(extract_mention("出什么 @ai 装备 @Ai"), Some("出什么  装备".to_string()));
        assert_eq!(extract_mention("  @ai  "), Some(String::new()));
        assert_eq!(extract_mention("队友在干嘛"), None);
    }

    #[test]
    fn set_mode_resets_everything() {
        let mut reactor = Reactor::new(Timings::default());
        reactor.set_mode(Mode::MultiTurnVoice);
        reactor.trigger_voice(true);
        assert!(reactor.ai().is_listening);
        assert!(reactor.next_due().is_some());

        reactor.set_mode(Mode::FullDuplex);
        assert_eq!(*reactor.ai(), AiState::default());
        assert!(reactor.state().log().is_empty());
        assert_eq!(reactor.next_due(), None);
    }
}
