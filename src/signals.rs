//! SIGINT handling for the interpreter and its stages.
//!
//! The interpreter never dies from an interactive interrupt: its handler only raises a flag
//! (installed with `SA_RESTART`, so a blocked `read` or `waitpid` resumes) and the read-eval
//! loop prints the line break. Stage processes go back to the default disposition so the same
//! interrupt terminates them.

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use signal_hook::consts::SIGINT;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by the interpreter's SIGINT handler, cleared by whoever reports the interrupt.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// Installs the interpreter's SIGINT handler and returns the flag it raises.
    pub fn install() -> std::io::Result<Self> {
        let flag = Self::default();
        signal_hook::flag::register(SIGINT, Arc::clone(&flag.raised))?;
        tracing::debug!("interrupt handler installed");
        Ok(flag)
    }

    /// Returns whether an interrupt arrived since the last call, and clears it.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::Relaxed)
    }

    /// Raises the flag the way the handler would.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Relaxed);
    }
}

/// Puts SIGINT back to `SIG_DFL` in the calling process.
pub fn restore_default_interrupt() -> nix::Result<()> {
    restore_default(Signal::SIGINT)
}

/// Resets everything a stage must not inherit from the interpreter.
///
/// Called by every stage right after `fork`, before any redirection. Besides SIGINT this
/// covers SIGPIPE, which the Rust runtime ignores in the interpreter; an ignored disposition
/// would survive `exec` and keep a writer alive after its reader has gone.
pub fn restore_default_dispositions() -> nix::Result<()> {
    restore_default_interrupt()?;
    restore_default(Signal::SIGPIPE)
}

fn restore_default(signal: Signal) -> nix::Result<()> {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: installing SIG_DFL runs no code in signal context.
    unsafe { sigaction(signal, &default) }.map(|_| ())
}
