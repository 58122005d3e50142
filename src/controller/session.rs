use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::COUNTDOWN_TICK_SECS;
use crate::controller::game::{GameController, WeakController};

/// A spawned repeating task that is aborted when dropped.
struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    fn spawn<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self { handle: tokio::spawn(fut) }
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The two timers and the conditions they were started under.
#[derive(Default)]
struct Timers {
    poll: Option<ScheduledTask>,
    /// Countdown task and the seed generation it counts.
    countdown: Option<(u64, ScheduledTask)>,
}

impl Timers {
    /// Starts or stops each timer so it matches the current state.
    fn reconcile(&mut self, controller: &GameController, poll_every: Duration) {
        let state = controller.snapshot();

        match (state.started, self.poll.is_some()) {
            (true, false) => {
                debug!(every_secs = poll_every.as_secs(), "Poll timer started");
                self.poll = Some(ScheduledTask::spawn(poll_loop(controller.downgrade(), poll_every)));
            }
            (false, true) => {
                debug!("Poll timer stopped");
                self.poll = None;
            }
            _ => {}
        }

        let countdown = &state.countdown;
        if countdown.is_running() {
            let generation = countdown.generation();
            let current = matches!(&self.countdown, Some((g, task)) if *g == generation && !task.is_finished());
            if !current {
                debug!(generation, remaining = ?countdown.remaining(), "Countdown timer started");
                self.countdown = Some((
                    generation,
                    ScheduledTask::spawn(countdown_loop(controller.downgrade(), generation)),
                ));
            }
        } else if self.countdown.take().is_some() {
            debug!("Countdown timer stopped");
        }
    }
}

async fn poll_loop(controller: WeakController, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // skip immediate first tick, initialize already fetched

    loop {
        ticker.tick().await;
        let Some(ctl) = controller.upgrade() else {
            return;
        };
        ctl.tick().await;
    }
}

async fn countdown_loop(controller: WeakController, generation: u64) {
    let mut ticker = interval(Duration::from_secs(COUNTDOWN_TICK_SECS));
    ticker.tick().await; // the seeded value is shown for a full second first

    loop {
        ticker.tick().await;
        let Some(ctl) = controller.upgrade() else {
            return;
        };
        if !ctl.countdown_tick(generation) {
            return;
        }
    }
}

/// Running view: owns the timer supervisor for one controller.
///
/// The supervisor wakes on every state change and reconciles the poll timer
/// (alive while the game is started) and the countdown timer (alive while the
/// countdown is above zero). Dropping the session or calling
/// [`GameSession::shutdown`] cancels both.
pub struct GameSession {
    controller: GameController,
    supervisor: JoinHandle<()>,
}

impl GameSession {
    pub fn start(controller: GameController, poll_every: Duration) -> Self {
        let mut rx = controller.subscribe();
        let watched = controller.downgrade();

        let supervisor = tokio::spawn(async move {
            let mut timers = Timers::default();
            loop {
                let _ = rx.borrow_and_update();
                {
                    let Some(ctl) = watched.upgrade() else {
                        break;
                    };
                    timers.reconcile(&ctl, poll_every);
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });

        info!(poll_secs = poll_every.as_secs(), "Game session started");
        Self { controller, supervisor }
    }

    pub fn controller(&self) -> &GameController {
        &self.controller
    }

    /// Cancels the supervisor and, with it, both timers.
    pub async fn shutdown(mut self) {
        self.supervisor.abort();
        let _ = (&mut self.supervisor).await;
        info!("Game session stopped");
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}
