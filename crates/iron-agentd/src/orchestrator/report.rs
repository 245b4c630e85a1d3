/// Counters of loop decisions, published while the loop runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Children started.
    pub spawned: u64,
    /// Children retired by a configuration reload.
    pub retired: u64,
    /// Changed environments not applied because reload is disabled.
    pub ignored_drift: u64,
    /// Snapshots whose composed environment matched the applied one.
    pub unchanged: u64,
    /// Store index of the last processed snapshot.
    pub last_index: u64,
}

/// Why the loop stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The child exited on its own.
    ChildExited,
    /// Shutdown was requested; the child was retired.
    Shutdown,
}

/// Final result of [`crate::Orchestrator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub exit_code: i32,
    pub reason: StopReason,
    pub stats: LoopStats,
}
