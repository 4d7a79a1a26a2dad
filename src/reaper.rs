use crate::command::ExitCode;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

/// How a stage process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(ExitCode),
    Signaled(Signal),
    /// `waitpid` failed for a reason other than `EINTR`; the process is not ours to wait for.
    Lost,
}

impl StageStatus {
    /// Shell-style exit code: the exit status, or 128 + signal number.
    pub fn code(&self) -> ExitCode {
        match self {
            StageStatus::Exited(code) => *code,
            StageStatus::Signaled(signal) => 128 + *signal as i32,
            StageStatus::Lost => -1,
        }
    }

    pub fn success(&self) -> bool {
        *self == StageStatus::Exited(0)
    }
}

/// Retries a system call interrupted by a signal.
pub(crate) fn syscall<F, T>(f: F) -> nix::Result<T>
where
    F: Fn() -> nix::Result<T>,
{
    loop {
        match f() {
            Err(nix::Error::EINTR) => (),
            result => return result,
        }
    }
}

/// Blocks on each stage in spawn order until it has terminated.
///
/// A stage that finishes before an earlier one simply stays a zombie until its turn comes.
pub fn reap(pids: &[Pid]) -> Vec<StageStatus> {
    pids.iter()
        .enumerate()
        .map(|(stage, &pid)| {
            let status = wait_terminated(pid);
            tracing::debug!(stage, %pid, ?status, "stage reaped");
            status
        })
        .collect()
}

fn wait_terminated(pid: Pid) -> StageStatus {
    loop {
        match syscall(|| waitpid(pid, None)) {
            Ok(WaitStatus::Exited(_, code)) => return StageStatus::Exited(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return StageStatus::Signaled(signal),
            // Stops and continues are not terminations; keep waiting.
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(%pid, error = %e, "waitpid failed");
                return StageStatus::Lost;
            }
        }
    }
}
