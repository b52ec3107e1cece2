//! Session-scoped detector pool keyed by level dimensions.
//!
//! Pyramid levels across many targets repeat the same sizes, so detectors
//! are created once per `(width, height)` and shared. Handles are `Arc`s;
//! [`DetectorPool::release_all`] refuses to dispose a detector while any
//! handle to it is still alive.

use crate::detect::{DetectorFactory, FeatureDetector};
use crate::trace::trace_event;
use crate::util::{TargetIdxError, TargetIdxResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a pooled detector.
pub type DetectorHandle<D> = Arc<D>;

/// Memoizing detector pool owned by one compile session.
pub struct DetectorPool<F: DetectorFactory> {
    factory: F,
    detectors: Mutex<HashMap<(usize, usize), Arc<F::Detector>>>,
    created: AtomicUsize,
}

impl<F: DetectorFactory> DetectorPool<F> {
    /// Creates an empty pool backed by `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            detectors: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Returns the detector for `(width, height)`, creating it on first request.
    pub fn acquire(
        &self,
        width: usize,
        height: usize,
    ) -> TargetIdxResult<DetectorHandle<F::Detector>> {
        let mut detectors = lock(&self.detectors);
        if let Some(detector) = detectors.get(&(width, height)) {
            return Ok(Arc::clone(detector));
        }
        let detector = Arc::new(self.factory.create(width, height)?);
        detectors.insert((width, height), Arc::clone(&detector));
        self.created.fetch_add(1, Ordering::Relaxed);
        trace_event!("detector_created", width = width, height = height);
        Ok(detector)
    }

    /// Number of detectors currently pooled.
    pub fn len(&self) -> usize {
        lock(&self.detectors).len()
    }

    /// Returns `true` if no detector is pooled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of detectors constructed over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Disposes every pooled detector and clears the pool.
    ///
    /// Fails with [`TargetIdxError::PoolInUse`] without disposing anything if
    /// a handle obtained from [`acquire`](Self::acquire) is still alive.
    pub fn release_all(&self) -> TargetIdxResult<()> {
        let mut detectors = lock(&self.detectors);
        if let Some((&(width, height), _)) = detectors
            .iter()
            .find(|(_, detector)| Arc::strong_count(detector) > 1)
        {
            return Err(TargetIdxError::PoolInUse { width, height });
        }
        let released = detectors.len();
        for (_, detector) in detectors.drain() {
            detector.dispose();
        }
        trace_event!("detector_pool_released", detectors = released);
        Ok(())
    }
}

impl<F: DetectorFactory> Drop for DetectorPool<F> {
    fn drop(&mut self) {
        let detectors = match self.detectors.get_mut() {
            Ok(detectors) => detectors,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, detector) in detectors.drain() {
            if Arc::strong_count(&detector) == 1 {
                detector.dispose();
            }
        }
    }
}

/// Locks a mutex, recovering the data if another task panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::FeaturePoint;
    use crate::image::pyramid::PyramidLevel;

    struct NullDetector {
        disposed: Arc<AtomicUsize>,
    }

    impl FeatureDetector for NullDetector {
        fn detect(&self, _level: &PyramidLevel) -> TargetIdxResult<Vec<FeaturePoint>> {
            Ok(Vec::new())
        }

        fn dispose(&self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NullFactory {
        disposed: Arc<AtomicUsize>,
    }

    impl DetectorFactory for NullFactory {
        type Detector = NullDetector;

        fn create(&self, width: usize, height: usize) -> TargetIdxResult<NullDetector> {
            if width == 0 || height == 0 {
                return Err(TargetIdxError::InvalidDimensions { width, height });
            }
            Ok(NullDetector {
                disposed: Arc::clone(&self.disposed),
            })
        }
    }

    fn pool() -> (DetectorPool<NullFactory>, Arc<AtomicUsize>) {
        let disposed = Arc::new(AtomicUsize::new(0));
        let factory = NullFactory {
            disposed: Arc::clone(&disposed),
        };
        (DetectorPool::new(factory), disposed)
    }

    #[test]
    fn same_size_is_created_once() {
        let (pool, _) = pool();
        for _ in 0..5 {
            let a = pool.acquire(64, 48).unwrap();
            let b = pool.acquire(64, 48).unwrap();
            assert!(Arc::ptr_eq(&a, &b));
        }
        pool.acquire(32, 24).unwrap();
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn release_disposes_every_detector() {
        let (pool, disposed) = pool();
        pool.acquire(10, 10).unwrap();
        pool.acquire(20, 10).unwrap();
        pool.release_all().unwrap();
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
        assert!(pool.is_empty());
        drop(pool);
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn release_refuses_while_handle_alive() {
        let (pool, disposed) = pool();
        let handle = pool.acquire(8, 8).unwrap();
        assert_eq!(
            pool.release_all(),
            Err(TargetIdxError::PoolInUse {
                width: 8,
                height: 8
            })
        );
        assert_eq!(disposed.load(Ordering::SeqCst), 0);
        drop(handle);
        pool.release_all().unwrap();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_errors_are_not_cached() {
        let (pool, _) = pool();
        assert!(pool.acquire(0, 4).is_err());
        assert_eq!(pool.created(), 0);
        assert!(pool.is_empty());
    }
}
