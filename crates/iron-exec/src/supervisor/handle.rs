use std::{fmt, time::Instant};

use iron_core::ExitOutcome;
use iron_model::{EnvMap, INTERNAL_FAILURE_EXIT_CODE};
use tokio::sync::{mpsc, oneshot, watch};

use crate::ExecError;

/// Lifecycle of a supervised child as seen by its exit-wait task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Starting,
    Running,
    /// A termination signal has been delivered.
    Exiting,
    Exited(i32),
}

impl LiveState {
    pub fn is_alive(&self) -> bool {
        !matches!(self, LiveState::Exited(_))
    }
}

/// The single exit notification published for a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub code: i32,
    pub outcome: ExitOutcome,
}

impl ChildExit {
    /// Exit whose status could not be determined.
    pub fn lost() -> Self {
        Self {
            code: INTERNAL_FAILURE_EXIT_CODE,
            outcome: ExitOutcome::Lost,
        }
    }
}

/// How a child was retired by [`crate::ProcessSupervisor::reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retired {
    /// Exited on its own or within the grace window.
    Exited(i32),
    /// Needed a forced kill.
    Killed(i32),
}

impl Retired {
    pub fn code(&self) -> i32 {
        match self {
            Retired::Exited(c) | Retired::Killed(c) => *c,
        }
    }
}

pub(crate) enum Control {
    Terminate(oneshot::Sender<Result<(), ExecError>>),
    Kill(oneshot::Sender<Result<(), ExecError>>),
}

enum ExitSlot {
    Pending(oneshot::Receiver<ChildExit>),
    Done(ChildExit),
}

/// Owner-side view of one spawned child.
///
/// The process itself belongs to a background exit-wait task; the handle talks to it
/// through a control channel and receives exactly one [`ChildExit`].
pub struct ProcessHandle {
    pid: u32,
    argv: Vec<String>,
    env: EnvMap,
    started: Instant,
    state: watch::Receiver<LiveState>,
    control: mpsc::Sender<Control>,
    exit: ExitSlot,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: u32,
        argv: Vec<String>,
        env: EnvMap,
        state: watch::Receiver<LiveState>,
        control: mpsc::Sender<Control>,
        exit: oneshot::Receiver<ChildExit>,
    ) -> Self {
        Self {
            pid,
            argv,
            env,
            started: Instant::now(),
            state,
            control,
            exit: ExitSlot::Pending(exit),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Composed environment the child was launched with (without inherited variables).
    pub fn env(&self) -> &EnvMap {
        &self.env
    }

    pub fn state(&self) -> LiveState {
        *self.state.borrow()
    }

    pub fn started_at(&self) -> Instant {
        self.started
    }

    /// Wait for the child's exit notification.
    ///
    /// Cancel-safe, so it can sit in a `select!`. Once received, the value is cached
    /// and returned again on later calls.
    pub async fn wait_exit(&mut self) -> ChildExit {
        match &mut self.exit {
            ExitSlot::Done(exit) => *exit,
            ExitSlot::Pending(rx) => {
                let exit = rx.await.unwrap_or_else(|_| ChildExit::lost());
                self.exit = ExitSlot::Done(exit);
                exit
            }
        }
    }

    /// Resolves once the process has been reaped.
    ///
    /// This can precede [`ProcessHandle::wait_exit`] by up to the output drain window.
    pub(crate) async fn reaped(&mut self) {
        let _ = self
            .state
            .wait_for(|s| matches!(s, LiveState::Exited(_)))
            .await;
    }

    /// Exit notification if it has already been published.
    pub fn try_exit(&mut self) -> Option<ChildExit> {
        match &mut self.exit {
            ExitSlot::Done(exit) => Some(*exit),
            ExitSlot::Pending(rx) => match rx.try_recv() {
                Ok(exit) => {
                    self.exit = ExitSlot::Done(exit);
                    Some(exit)
                }
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => {
                    let exit = ChildExit::lost();
                    self.exit = ExitSlot::Done(exit);
                    Some(exit)
                }
            },
        }
    }

    /// Ask the exit-wait task to deliver `SIGTERM`.
    pub async fn terminate(&self) -> Result<(), ExecError> {
        self.request(Control::Terminate).await
    }

    /// Ask the exit-wait task to kill the child.
    pub async fn kill(&self) -> Result<(), ExecError> {
        self.request(Control::Kill).await
    }

    async fn request(&self, make: fn(oneshot::Sender<Result<(), ExecError>>) -> Control) -> Result<(), ExecError> {
        let (tx, rx) = oneshot::channel();
        self.control
            .send(make(tx))
            .await
            .map_err(|_| ExecError::Exited)?;
        // A dropped reply means the child was reaped before the request was handled.
        rx.await.map_err(|_| ExecError::Exited)?
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("argv", &self.argv)
            .field("env_len", &self.env.len())
            .field("state", &self.state())
            .finish()
    }
}
