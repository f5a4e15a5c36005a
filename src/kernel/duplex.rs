//! Full-duplex companion loop.
//!
//! While duplex is active the assistant runs proactive cycles: a broadcast,
//! an AI line, a simulated player follow-up and a reply, then a pause before
//! the next cycle. A busy flag keeps at most one cycle in flight.
//!
//! Each cycle runs under an epoch. Deactivation, mode changes and barge-in
//! bump the epoch, so the remaining steps of an abandoned cycle are no-ops.

use tracing::{debug, info};

use super::context::{Context, CyclePhase, Step};
use super::fixtures::{copy, DuplexScenario, DUPLEX_SCENARIOS};
use super::log::LogRole;
use super::scheduler::TimerToken;
use super::state::{Mode, StateDelta};

#[derive(Debug, Default)]
pub struct DuplexLoop {
    busy: bool,
    /// Yielding to a player-driven session; resumes when it ends.
    parked: bool,
    epoch: u64,
    scenario_index: usize,
    scenario: Option<DuplexScenario>,
    timer: Option<TimerToken>,
}

impl DuplexLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_parked(&self) -> bool {
        self.parked
    }

    /// Scenario of the cycle in flight.
    pub fn scenario(&self) -> Option<&DuplexScenario> {
        self.scenario.as_ref()
    }

    pub fn is_live(&self, ctx: &Context, epoch: u64) -> bool {
        epoch == self.epoch && ctx.state.duplex_active && ctx.state.mode == Mode::FullDuplex
    }

    pub fn activate(&mut self, ctx: &mut Context) {
        self.abort(ctx);
        self.parked = false;
        ctx.state.set_duplex_active(true);
        ctx.state.clear_log();
        ctx.log(LogRole::System, copy::DUPLEX_HANDSHAKE);
        ctx.log(LogRole::Asr, copy::DUPLEX_READY);

        let delay = ctx.timings.duplex_first_cycle_ms;
        self.arm(ctx, delay, CyclePhase::Trigger);
        info!(epoch = self.epoch, "duplex activated");
    }

    pub fn deactivate(&mut self, ctx: &mut Context) {
        self.abort(ctx);
        self.parked = false;
        ctx.state.set_duplex_active(false);
        ctx.log(LogRole::System, copy::DUPLEX_CLOSED);
        ctx.reduce(StateDelta::SpeechEnded);
        info!("duplex deactivated");
    }

    /// Start a cycle now. A no-op while a cycle is in flight or the loop is
    /// parked; parks the loop instead when a player-driven session holds the
    /// floor.
    pub fn trigger(&mut self, ctx: &mut Context, session_in_flight: bool) -> bool {
        if !ctx.state.duplex_active || ctx.state.mode != Mode::FullDuplex {
            return false;
        }
        if self.busy {
            debug!(epoch = self.epoch, "cycle already in flight, trigger ignored");
            return false;
        }
        if self.parked {
            debug!(epoch = self.epoch, "loop parked, trigger ignored");
            return false;
        }
        if session_in_flight {
            self.park(ctx);
            return false;
        }
        if let Some(token) = self.timer.take() {
            ctx.scheduler.cancel(token);
        }

        self.busy = true;
        let scenario = DUPLEX_SCENARIOS[self.scenario_index % DUPLEX_SCENARIOS.len()];
        self.scenario_index += 1;
        self.scenario = Some(scenario);

        ctx.log(LogRole::System, copy::duplex_broadcast(scenario.trigger));
        let delay = ctx.timings.duplex_broadcast_lead_ms;
        self.arm(ctx, delay, CyclePhase::AiLine);
        info!(epoch = self.epoch, trigger = scenario.trigger, "proactive cycle started");
        true
    }

    pub fn on_step(&mut self, ctx: &mut Context, epoch: u64, phase: CyclePhase, session_in_flight: bool) {
        if !self.is_live(ctx, epoch) {
            debug!(epoch, ?phase, "discarded stale duplex step");
            return;
        }
        self.timer = None;

        if phase == CyclePhase::Trigger {
            self.trigger(ctx, session_in_flight);
            return;
        }
        let Some(scenario) = self.scenario else {
            return;
        };
        let t = &ctx.timings;
        let (utterance, follow_up, reply, gap) =
            (t.duplex_utterance_ms, t.duplex_follow_up_ms, t.duplex_reply_ms, t.duplex_cycle_gap_ms);

        match phase {
            CyclePhase::AiLine => {
                ctx.log(LogRole::Llm, copy::duplex_ai_line(scenario.ai));
                ctx.reduce(StateDelta::SpeechStarted(scenario.ai.to_string()));
                self.arm(ctx, utterance, CyclePhase::AiLineDone);
            }
            CyclePhase::AiLineDone => {
                ctx.reduce(StateDelta::SpeechEnded);
                self.arm(ctx, follow_up, CyclePhase::FollowUp);
            }
            CyclePhase::FollowUp => {
                ctx.log(LogRole::Asr, copy::duplex_user_line(scenario.user));
                self.arm(ctx, reply, CyclePhase::Reply);
            }
            CyclePhase::Reply => {
                ctx.log(LogRole::Llm, copy::duplex_reply_line(scenario.reply));
                ctx.reduce(StateDelta::SpeechStarted(scenario.reply.to_string()));
                self.arm(ctx, utterance, CyclePhase::ReplyDone);
            }
            CyclePhase::ReplyDone => {
                ctx.reduce(StateDelta::SpeechEnded);
                self.busy = false;
                self.scenario = None;
                self.arm(ctx, gap, CyclePhase::Trigger);
                debug!(epoch, "proactive cycle finished");
            }
            CyclePhase::Trigger => {}
        }
    }

    /// Abandon any cycle in flight and wait for `resume`.
    pub fn park(&mut self, ctx: &mut Context) {
        if self.parked {
            return;
        }
        if self.busy && ctx.state.ai().is_speaking {
            ctx.reduce(StateDelta::SpeechEnded);
        }
        self.abort(ctx);
        self.parked = true;
        debug!(epoch = self.epoch, "duplex loop parked");
    }

    /// Schedule the next cycle after the usual gap, if parked.
    pub fn resume(&mut self, ctx: &mut Context) {
        if !self.parked || !ctx.state.duplex_active {
            return;
        }
        self.parked = false;
        let gap = ctx.timings.duplex_cycle_gap_ms;
        self.arm(ctx, gap, CyclePhase::Trigger);
        debug!(epoch = self.epoch, "duplex loop resumed");
    }

    /// Forget everything but the scenario rotation. The caller has already
    /// cleared the scheduler.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.busy = false;
        self.parked = false;
        self.scenario = None;
        self.timer = None;
    }

    fn abort(&mut self, ctx: &mut Context) {
        self.epoch += 1;
        if let Some(token) = self.timer.take() {
            ctx.scheduler.cancel(token);
        }
        self.busy = false;
        self.scenario = None;
    }

    fn arm(&mut self, ctx: &mut Context, delay_ms: u64, phase: CyclePhase) {
        self.timer = Some(ctx.after(delay_ms, Step::Duplex { epoch: self.epoch, phase }));
    }
}
