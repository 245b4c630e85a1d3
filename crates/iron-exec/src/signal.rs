//! Raw signal delivery and exit-status decoding.
use std::process::ExitStatus;

use iron_core::ExitOutcome;
use iron_model::SIGNAL_EXIT_BASE;

use crate::ExecError;

/// Send `SIGTERM` to `pid`.
#[cfg(unix)]
pub(crate) fn terminate(pid: u32) -> Result<(), ExecError> {
    let raw = libc::pid_t::try_from(pid)
        .map_err(|_| ExecError::InvalidSpec(format!("pid {pid} out of range")))?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(ExecError::Signal {
            pid,
            source: std::io::Error::last_os_error(),
        })
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate(pid: u32) -> Result<(), ExecError> {
    Err(ExecError::Signal {
        pid,
        source: std::io::Error::new(std::io::ErrorKind::Unsupported, "SIGTERM is unix-only"),
    })
}

/// Map an exit status to the code the supervisor reports and its metrics outcome.
///
/// Signal terminations follow the shell convention `128 + signo`.
pub(crate) fn decode_status(status: &ExitStatus) -> (i32, ExitOutcome) {
    if let Some(code) = status.code() {
        let outcome = if code == 0 {
            ExitOutcome::Success
        } else {
            ExitOutcome::Failure
        };
        return (code, outcome);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return (SIGNAL_EXIT_BASE + signo, ExitOutcome::Signaled);
        }
    }
    (iron_model::INTERNAL_FAILURE_EXIT_CODE, ExitOutcome::Lost)
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use super::*;

    #[test]
    fn plain_exit_codes_pass_through() {
        assert_eq!(decode_status(&ExitStatus::from_raw(0)), (0, ExitOutcome::Success));
        assert_eq!(decode_status(&ExitStatus::from_raw(2 << 8)), (2, ExitOutcome::Failure));
    }

    #[test]
    fn signals_map_to_128_plus_signo() {
        assert_eq!(
            decode_status(&ExitStatus::from_raw(libc::SIGKILL)),
            (128 + libc::SIGKILL, ExitOutcome::Signaled)
        );
        assert_eq!(
            decode_status(&ExitStatus::from_raw(libc::SIGTERM)),
            (143, ExitOutcome::Signaled)
        );
    }
}
