use tracing::{debug, info};

use super::context::{Context, Step};
use super::fixtures::copy;
use super::log::LogRole;
use super::scheduler::TimerToken;
use super::state::{Mode, StateDelta};

/// Multi-turn listening window: `Idle -> Listening(n) -> Idle`.
///
/// The countdown is owned by the window, not by any session: follow-up
/// queries run inside it without touching the timer. Only expiry or an
/// explicit close ends it.
#[derive(Debug, Default)]
pub struct ListeningWindow {
    tick: Option<TimerToken>,
}

impl ListeningWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.tick.is_some()
    }

    pub fn open(&mut self, ctx: &mut Context) {
        if let Some(token) = self.tick.take() {
            ctx.scheduler.cancel(token);
        }
        let seconds = ctx.timings.listening_window_secs;
        ctx.state.clear_log();
        ctx.reduce(StateDelta::WindowOpened { seconds });
        ctx.log(LogRole::System, copy::WINDOW_OPENED);

        let interval = ctx.timings.countdown_interval_ms;
        self.tick = Some(ctx.scheduler.every(interval, Step::ListeningTick));
        info!(seconds, "listening window opened");
    }

    /// Explicit toggle-off by the player.
    pub fn close(&mut self, ctx: &mut Context) {
        let Some(token) = self.tick.take() else {
            return;
        };
        ctx.scheduler.cancel(token);
        ctx.reduce(StateDelta::WindowClosed);
        ctx.log(LogRole::System, copy::WINDOW_CLOSED);
        info!("listening window closed");
    }

    pub fn on_tick(&mut self, ctx: &mut Context, token: TimerToken) {
        let live = self.tick == Some(token)
            && ctx.state.mode == Mode::MultiTurnVoice
            && ctx.state.ai().is_listening;
        if !live {
            ctx.scheduler.cancel(token);
            if self.tick == Some(token) {
                self.tick = None;
            }
            debug!("discarded stale countdown tick");
            return;
        }

        ctx.reduce(StateDelta::CountdownTick);
        if ctx.state.ai().timer == 0 {
            ctx.scheduler.cancel(token);
            self.tick = None;
            ctx.reduce(StateDelta::WindowClosed);
            ctx.log(LogRole::System, copy::WINDOW_TIMED_OUT);
            info!("listening window timed out");
        }
    }

    /// Forget the countdown. The caller has already cleared the scheduler.
    pub fn reset(&mut self) {
        self.tick = None;
    }
}
