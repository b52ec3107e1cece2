//! Progress reporting and suspension points for the compile loop.

/// Share of the progress range reserved for matching extraction.
pub(crate) const MATCHING_SHARE: f32 = 50.0;

/// Maps per-target work onto the `0..=100` progress range.
///
/// Matching extraction owns `0..50`, split evenly by target and then by
/// pyramid level; tracking assembly owns `50..100`, split by target.
pub(crate) struct ProgressReporter<'a, P: Fn(f32) + Sync> {
    sink: &'a P,
    targets: usize,
}

impl<'a, P: Fn(f32) + Sync> ProgressReporter<'a, P> {
    pub(crate) fn new(sink: &'a P, targets: usize) -> Self {
        Self {
            sink,
            targets: targets.max(1),
        }
    }

    /// Reports `done` of `total` levels finished for `target`.
    pub(crate) fn matching(&self, target: usize, done: usize, total: usize) {
        let slice = MATCHING_SHARE / self.targets as f32;
        let within = if total == 0 {
            1.0
        } else {
            done.min(total) as f32 / total as f32
        };
        (self.sink)(slice * target as f32 + slice * within);
    }

    /// Reports tracking assembly finished for `target`.
    pub(crate) fn tracking(&self, target: usize) {
        let slice = (100.0 - MATCHING_SHARE) / self.targets as f32;
        (self.sink)(MATCHING_SHARE + slice * (target + 1) as f32);
    }
}

/// Suspension point invoked every few processed pyramid levels.
///
/// Implementations decide what suspending means for the host scheduler; it
/// must never change compile results.
pub trait Suspend: Send + Sync {
    fn suspend(&self);
}

/// Suspension that does nothing, for thread-pool or batch execution.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoSuspend;

impl Suspend for NoSuspend {
    fn suspend(&self) {}
}

/// Suspension that yields the current OS thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadYield;

impl Suspend for ThreadYield {
    fn suspend(&self) {
        std::thread::yield_now();
    }
}
