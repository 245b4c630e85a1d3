use std::time::{Duration, Instant};

use iron_core::MetricsHandle;
use tokio::{
    process::Child,
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use super::handle::{ChildExit, Control, LiveState};
use crate::signal;

/// Everything the exit-wait task owns for one child.
pub(crate) struct ExitWatch {
    pub child: Child,
    pub pid: u32,
    pub control: mpsc::Receiver<Control>,
    pub state: watch::Sender<LiveState>,
    pub exit: oneshot::Sender<ChildExit>,
    pub forwarders: Vec<JoinHandle<()>>,
    pub drain: Duration,
    pub metrics: MetricsHandle,
}

impl ExitWatch {
    /// Wait for the child to terminate, serving control requests meanwhile, then
    /// publish its single exit notification once trailing output is drained.
    pub(crate) async fn run(mut self) {
        let started = Instant::now();
        self.state.send_replace(LiveState::Running);

        let status = loop {
            tokio::select! {
                res = self.child.wait() => break res,
                Some(ctl) = self.control.recv() => self.handle(ctl),
            }
        };
        // Requests arriving from now on see a closed channel.
        self.control.close();

        let exit = match status {
            Ok(status) => {
                let (code, outcome) = signal::decode_status(&status);
                ChildExit { code, outcome }
            }
            Err(e) => {
                warn!(pid = self.pid, error = %e, "failed to collect child exit status");
                ChildExit::lost()
            }
        };

        // Reaped: the grace window of a reload ends here, not after the drain.
        self.state.send_replace(LiveState::Exited(exit.code));
        let lifetime = started.elapsed();

        self.drain_output().await;

        self.metrics.record_exit(exit.outcome, lifetime.as_millis() as u64);
        info!(
            pid = self.pid,
            code = exit.code,
            outcome = exit.outcome.as_label(),
            lifetime_ms = lifetime.as_millis() as u64,
            "child exited"
        );
        let _ = self.exit.send(exit);
    }

    fn handle(&mut self, ctl: Control) {
        match ctl {
            Control::Terminate(reply) => {
                debug!(pid = self.pid, "sending SIGTERM");
                let res = signal::terminate(self.pid);
                if res.is_ok() {
                    self.state.send_replace(LiveState::Exiting);
                }
                let _ = reply.send(res);
            }
            Control::Kill(reply) => {
                debug!(pid = self.pid, "sending SIGKILL");
                let res = self.child.start_kill().map_err(Into::into);
                if res.is_ok() {
                    self.state.send_replace(LiveState::Exiting);
                }
                let _ = reply.send(res);
            }
        }
    }

    /// Give the forwarders a bounded window to deliver trailing output.
    ///
    /// A grandchild can keep the pipes open after the child is gone; such forwarders
    /// are aborted once the window closes.
    async fn drain_output(&mut self) {
        let deadline = tokio::time::Instant::now() + self.drain;
        for fwd in self.forwarders.iter_mut() {
            if tokio::time::timeout_at(deadline, &mut *fwd).await.is_err() {
                debug!(pid = self.pid, "output forwarder still open after exit, aborting");
                fwd.abort();
            }
        }
    }
}
