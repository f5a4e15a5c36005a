use tracing::{debug, info};

use super::context::{Context, Step};
use super::duplex::DuplexLoop;
use super::fixtures::{copy, BARGE_IN_UTTERANCE};
use super::log::LogRole;
use super::scheduler::TimerToken;
use super::session::PipelineSession;
use super::state::{Mode, StateDelta};

/// Barge-in: the player talks over the assistant during full-duplex.
///
/// Speech stops at once. The captured utterance is recognised a moment later
/// and answered by a fresh pipeline run.
#[derive(Debug, Default)]
pub struct InterruptHandler {
    pending: Option<TimerToken>,
}

impl InterruptHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Only meaningful while duplex is on and the assistant is speaking.
    /// Returns whether the barge-in was accepted.
    pub fn interrupt(
        &mut self,
        ctx: &mut Context,
        session: &mut PipelineSession,
        duplex: &mut DuplexLoop,
    ) -> bool {
        let valid = ctx.state.mode == Mode::FullDuplex
            && ctx.state.duplex_active
            && ctx.state.ai().is_speaking;
        if !valid {
            debug!("interrupt ignored, nothing to barge in on");
            return false;
        }

        session.invalidate(ctx);
        duplex.park(ctx);
        self.cancel(ctx);

        ctx.log(LogRole::UserAction, copy::BARGE_IN_DETECTED);
        ctx.log(LogRole::System, copy::BARGE_IN_STOP_TTS);
        ctx.reduce(StateDelta::SpeechEnded);

        let delay = ctx.timings.barge_in_delay_ms;
        self.pending = Some(ctx.after(delay, Step::BargeIn { epoch: duplex.epoch() }));
        info!(epoch = duplex.epoch(), "barge-in accepted");
        true
    }

    /// The captured utterance is ready. Returns true when the caller should
    /// start a session for it.
    pub fn on_barge_in(
        &mut self,
        ctx: &mut Context,
        token: TimerToken,
        epoch: u64,
        duplex: &DuplexLoop,
    ) -> bool {
        if self.pending != Some(token) {
            debug!("discarded stale barge-in");
            return false;
        }
        self.pending = None;
        if !duplex.is_live(ctx, epoch) {
            debug!(epoch, "barge-in outlived its duplex epoch");
            return false;
        }
        ctx.log(LogRole::Asr, copy::barge_in_query(BARGE_IN_UTTERANCE));
        true
    }

    /// Drop a pending recognition, releasing its timer.
    pub fn cancel(&mut self, ctx: &mut Context) {
        if let Some(token) = self.pending.take() {
            ctx.scheduler.cancel(token);
        }
    }

    /// Forget the pending recognition. The caller has already cleared the
    /// scheduler.
    pub fn reset(&mut self) {
        self.pending = None;
    }
}
