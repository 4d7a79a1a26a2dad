//! Pipes that connect neighbouring pipeline stages.
//!
//! Channel `i` joins stage `i` (writer) and stage `i + 1` (reader), so a pipeline of `n`
//! stages owns `n - 1` channels. Every endpoint is an [`OwnedFd`]: releasing an endpoint means
//! dropping it, and whatever is still held when [`Channels`] goes away is closed as well.

use nix::unistd::pipe;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

#[derive(Debug)]
struct Channel {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
}

/// All channels of one pipeline launch.
#[derive(Debug, Default)]
pub struct Channels {
    channels: Vec<Channel>,
}

impl Channels {
    /// Creates the pipes for a pipeline of `stages` stages.
    ///
    /// On failure the pipes created so far are closed before the error is returned.
    pub fn allocate(stages: usize) -> nix::Result<Self> {
        let count = stages.saturating_sub(1);
        let mut channels = Vec::with_capacity(count);
        for _ in 0..count {
            let (read, write) = pipe()?;
            channels.push(Channel {
                read: Some(read),
                write: Some(write),
            });
        }
        tracing::debug!(count, "allocated stage channels");
        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Descriptor stage `stage` has to read its stdin from, if it is not the first stage.
    pub fn stdin_for(&self, stage: usize) -> Option<RawFd> {
        let channel = self.channels.get(stage.checked_sub(1)?)?;
        channel.read.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Descriptor stage `stage` has to write its stdout to, if it is not the last stage.
    pub fn stdout_for(&self, stage: usize) -> Option<RawFd> {
        let channel = self.channels.get(stage)?;
        channel.write.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Drops the endpoints stage `stage` inherited when it was forked.
    ///
    /// After this the parent holds only the read end of channel `stage`, which the next stage
    /// still has to inherit.
    pub fn release_spawned(&mut self, stage: usize) {
        if let Some(channel) = self.channels.get_mut(stage) {
            channel.write = None;
        }
        if let Some(channel) = stage.checked_sub(1).and_then(|i| self.channels.get_mut(i)) {
            channel.read = None;
        }
    }

    /// Closes every endpoint still held.
    pub fn close_all(&mut self) {
        for channel in &mut self.channels {
            channel.read = None;
            channel.write = None;
        }
    }

    /// Number of endpoints that are still open in this process.
    pub(crate) fn open_endpoints(&self) -> usize {
        self.channels
            .iter()
            .map(|c| c.read.is_some() as usize + c.write.is_some() as usize)
            .sum()
    }
}
