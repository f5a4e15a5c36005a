//! Pipeline session executor.
//!
//! One run walks ASR -> VAD -> NLP -> LLM -> TTS with fixed simulated gaps,
//! asks the provider exactly once, then "speaks" the reply for a while.
//! Non-voice modes skip the staged log and go straight to the provider.
//!
//! Every resume (timer or provider reply) is checked against the run's
//! generation. A superseded or cancelled run never touches state again.
//!
//! Text chat mentions are not runs: each one waits for its own reply and
//! several may be outstanding at once.

use tracing::{debug, info, warn};

use super::chat::Sender;
use super::context::{Context, SessionStage, Step};
use super::event::{ProviderRequest, SideEffect};
use super::fixtures::{copy, EMPTY_REPLY, FALLBACK_REPLY};
use super::log::LogRole;
use super::scheduler::TimerToken;
use super::state::{GameContext, Mode, StateDelta};
use super::time::Timestamp;
use crate::services::llm::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continuing,
    Ended,
    /// The resume belonged to a superseded run, or arrived out of order.
    Stale,
}

/// One orchestrated flow. Lives until its speech ends or it is invalidated.
#[derive(Debug, Clone)]
pub struct SessionRun {
    pub generation: u64,
    pub mode: Mode,
    pub cancelled: bool,
    pub query: String,
    pub context: GameContext,
    stage: SessionStage,
    requested_at: Option<Timestamp>,
    response: Option<String>,
    timer: Option<TimerToken>,
}

impl SessionRun {
    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct PipelineSession {
    current: Option<SessionRun>,
    /// Text chat generations still waiting for a reply.
    chats: Vec<u64>,
    next_generation: u64,
}

impl PipelineSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SessionRun> {
        self.current.as_ref()
    }

    pub fn in_flight(&self) -> bool {
        self.current.as_ref().is_some_and(|run| !run.cancelled)
    }

    pub fn is_live(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|run| run.generation == generation && !run.cancelled)
    }

    /// Text chat replies still outstanding.
    pub fn pending_chats(&self) -> usize {
        self.chats.len()
    }

    /// Launch a run for `query` in the current mode, superseding any run
    /// still in flight. Returns the new generation. In text chat nothing is
    /// superseded.
    pub fn start(&mut self, ctx: &mut Context, query: &str) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let mode = ctx.state.mode;

        if mode == Mode::TextChat {
            self.chats.push(generation);
            ctx.request(ProviderRequest {
                generation,
                query: query.to_string(),
                context: ctx.state.game_context,
            });
            info!(generation, pending = self.chats.len(), "chat reply requested");
            return generation;
        }

        self.invalidate(ctx);
        let mut run = SessionRun {
            generation,
            mode,
            cancelled: false,
            query: query.to_string(),
            context: ctx.state.game_context,
            stage: SessionStage::AwaitingReply,
            requested_at: None,
            response: None,
            timer: None,
        };
        info!(generation, ?mode, "session started");

        if mode.is_voice() {
            ctx.log(LogRole::Asr, copy::asr_query(query));
            let delay = ctx.timings.asr_to_vad_ms;
            schedule(&mut run, ctx, delay, SessionStage::Vad);
        } else {
            if mode == Mode::GuidedQuery {
                ctx.reduce(StateDelta::ThinkingStarted);
            }
            request(&mut run, ctx);
        }

        self.current = Some(run);
        generation
    }

    /// Cancel the in-flight run. Its pending timer is released and any
    /// presentation it owns (thinking, speaking) is cleared.
    pub fn invalidate(&mut self, ctx: &mut Context) -> Option<u64> {
        self.chats.clear();
        let run = self.current.as_mut().filter(|run| !run.cancelled)?;
        run.cancelled = true;
        if let Some(token) = run.timer.take() {
            ctx.scheduler.cancel(token);
        }
        match run.stage {
            SessionStage::SpeechEnd => ctx.reduce(StateDelta::SpeechEnded),
            SessionStage::AwaitingReply | SessionStage::LlmResult if ctx.state.ai().is_thinking => {
                ctx.reduce(StateDelta::ThinkingFinished)
            }
            _ => {}
        }
        debug!(generation = run.generation, stage = ?run.stage, "session invalidated");
        Some(run.generation)
    }

    /// Resume a run after a scheduled delay.
    pub fn advance(&mut self, ctx: &mut Context, generation: u64, stage: SessionStage) -> Progress {
        let Some(run) = self.live_run(generation) else {
            debug!(generation, ?stage, "discarded stale pipeline step");
            return Progress::Stale;
        };
        if run.stage != stage {
            debug!(generation, expected = ?run.stage, got = ?stage, "out-of-order pipeline step");
            return Progress::Stale;
        }
        run.timer = None;

        match stage {
            SessionStage::Vad => {
                ctx.log(LogRole::Vad, copy::VAD_END);
                let delay = ctx.timings.vad_to_nlp_ms;
                schedule(run, ctx, delay, SessionStage::Nlp);
            }
            SessionStage::Nlp => {
                ctx.log(LogRole::Nlp, copy::NLP_EXTRACT);
                let delay = ctx.timings.nlp_to_llm_ms;
                schedule(run, ctx, delay, SessionStage::LlmRequest);
            }
            SessionStage::LlmRequest => {
                ctx.log(LogRole::Llm, copy::LLM_REQUEST);
                ctx.reduce(StateDelta::ThinkingStarted);
                request(run, ctx);
            }
            SessionStage::LlmResult => {
                let text = run.response.clone().unwrap_or_default();
                ctx.log(LogRole::Llm, copy::llm_result(&text));
                ctx.reduce(StateDelta::ThinkingFinished);
                let delay = ctx.timings.llm_to_tts_ms;
                schedule(run, ctx, delay, SessionStage::TtsStart);
            }
            SessionStage::TtsStart => {
                ctx.log(LogRole::Tts, copy::TTS_SYNTH);
                let delay = ctx.timings.tts_synthesis_ms;
                schedule(run, ctx, delay, SessionStage::TtsReady);
            }
            SessionStage::TtsReady => {
                ctx.log(LogRole::Tts, copy::TTS_READY);
                begin_speaking(run, ctx);
            }
            SessionStage::SpeechEnd => {
                if run.mode.is_voice() {
                    ctx.log(LogRole::System, copy::SESSION_CLOSED);
                }
                ctx.reduce(StateDelta::SpeechEnded);
                info!(generation, "session closed");
                self.current = None;
                return Progress::Ended;
            }
            SessionStage::AwaitingReply => return Progress::Stale,
        }
        Progress::Continuing
    }

    /// Resume a run with the provider's answer. Failures become the fallback
    /// text here and go no further.
    pub fn on_reply(
        &mut self,
        ctx: &mut Context,
        generation: u64,
        reply: Result<String, ProviderError>,
    ) -> Progress {
        if let Some(pos) = self.chats.iter().position(|&g| g == generation) {
            self.chats.remove(pos);
            let text = resolve_reply(reply);
            let now = ctx.now();
            ctx.state.push_chat(Sender::Ai, text.clone(), now);
            ctx.emit(SideEffect::SessionCompleted { generation, response: text });
            info!(generation, "chat reply delivered");
            return Progress::Ended;
        }
        let Some(run) = self.live_run(generation) else {
            debug!(generation, "discarded stale provider reply");
            return Progress::Stale;
        };
        if run.stage != SessionStage::AwaitingReply {
            debug!(generation, stage = ?run.stage, "unexpected provider reply");
            return Progress::Stale;
        }

        let text = resolve_reply(reply);
        run.response = Some(text.clone());

        match run.mode {
            Mode::GuidedQuery => begin_speaking(run, ctx),
            _ => {
                let latency = run.requested_at.map(|at| ctx.now().since(at)).unwrap_or(0);
                let wait = ctx.timings.thinking_floor_ms.saturating_sub(latency);
                schedule(run, ctx, wait, SessionStage::LlmResult);
            }
        }
        Progress::Continuing
    }

    fn live_run(&mut self, generation: u64) -> Option<&mut SessionRun> {
        self.current
            .as_mut()
            .filter(|run| run.generation == generation && !run.cancelled)
    }
}

/// Provider outcome to display text. Never fails.
pub fn resolve_reply(reply: Result<String, ProviderError>) -> String {
    match reply {
        Ok(text) if text.is_empty() => EMPTY_REPLY.to_string(),
        Ok(text) => text,
        Err(ProviderError::Empty) => EMPTY_REPLY.to_string(),
        Err(e) => {
            warn!(error = %e, "provider failed, using fallback reply");
            FALLBACK_REPLY.to_string()
        }
    }
}

fn schedule(run: &mut SessionRun, ctx: &mut Context, delay_ms: u64, stage: SessionStage) {
    run.stage = stage;
    run.timer = Some(ctx.after(delay_ms, Step::Pipeline { generation: run.generation, stage }));
}

fn request(run: &mut SessionRun, ctx: &mut Context) {
    run.stage = SessionStage::AwaitingReply;
    run.requested_at = Some(ctx.now());
    ctx.request(ProviderRequest {
        generation: run.generation,
        query: run.query.clone(),
        context: run.context,
    });
}

fn begin_speaking(run: &mut SessionRun, ctx: &mut Context) {
    let text = run.response.clone().unwrap_or_default();
    ctx.emit(SideEffect::SessionCompleted { generation: run.generation, response: text.clone() });
    ctx.reduce(StateDelta::SpeechStarted(text));
    let delay = ctx.timings.speaking_ms;
    schedule(run, ctx, delay, SessionStage::SpeechEnd);
}
