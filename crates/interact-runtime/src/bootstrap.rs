//! Connection bootstrap tracking
//!
//! After the service says `hello` the session syncs the clock, then caches
//! scenes, then groups. The session is `Connected` once all three are done.
//! Every lost connection resets the flags.

/// One bootstrap request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BootstrapStep {
    SyncTime,
    CacheScenes,
    CacheGroups,
    Complete,
}

/// Completion flags for the three bootstrap requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bootstrap {
    time_synced: bool,
    scenes_cached: bool,
    groups_cached: bool,
}

impl Bootstrap {
    pub fn new() -> Self {
        Bootstrap::default()
    }

    /// First step still outstanding
    pub fn next_step(&self) -> BootstrapStep {
        if !self.time_synced {
            BootstrapStep::SyncTime
        } else if !self.scenes_cached {
            BootstrapStep::CacheScenes
        } else if !self.groups_cached {
            BootstrapStep::CacheGroups
        } else {
            BootstrapStep::Complete
        }
    }

    /// Mark `step` done. Returns true only for the call that completes the
    /// bootstrap.
    pub fn complete(&mut self, step: BootstrapStep) -> bool {
        let was_complete = self.is_complete();
        match step {
            BootstrapStep::SyncTime => self.time_synced = true,
            BootstrapStep::CacheScenes => self.scenes_cached = true,
            BootstrapStep::CacheGroups => self.groups_cached = true,
            BootstrapStep::Complete => {}
        }
        !was_complete && self.is_complete()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.time_synced && self.scenes_cached && self.groups_cached
    }

    pub fn reset(&mut self) {
        *self = Bootstrap::default();
    }
}
