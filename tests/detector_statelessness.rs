use targetidx::lowlevel::{
    resample_level, DetectorPool, ExtremaDetector, ExtremaDetectorConfig, ExtremaDetectorFactory,
};
use targetidx::image::ImageView;
use targetidx::{ExtremumSign, FeatureDetector, PyramidLevel, TargetIdxError};

fn make_level(width: usize, height: usize, seed: usize, scale: f32) -> PyramidLevel {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            data.push((((x * 13 + seed) ^ (y * 7) ^ (x * y)) & 0xFF) as u8);
        }
    }
    let view = ImageView::from_slice(&data, width, height).unwrap();
    let mut level = resample_level(view, 1.0).unwrap();
    level.scale = scale;
    level
}

#[test]
fn interleaved_use_matches_fresh_detectors() {
    let a = make_level(96, 80, 0, 1.0);
    let b = make_level(96, 80, 41, 0.5);
    let shared = ExtremaDetector::new(96, 80, ExtremaDetectorConfig::default()).unwrap();

    let first_a = shared.detect(&a).unwrap();
    let first_b = shared.detect(&b).unwrap();
    let again_a = shared.detect(&a).unwrap();

    let fresh = |level: &PyramidLevel| {
        ExtremaDetector::new(96, 80, ExtremaDetectorConfig::default())
            .unwrap()
            .detect(level)
            .unwrap()
    };
    assert_eq!(first_a, fresh(&a));
    assert_eq!(first_b, fresh(&b));
    assert_eq!(again_a, first_a);
    assert!(!first_a.is_empty());
}

#[test]
fn concurrent_detection_through_pooled_handle_is_consistent() {
    let pool = DetectorPool::new(ExtremaDetectorFactory::default());
    let levels: Vec<PyramidLevel> = (0..4).map(|i| make_level(64, 64, i * 29, 1.0)).collect();
    let expected: Vec<_> = levels
        .iter()
        .map(|level| pool.acquire(64, 64).unwrap().detect(level).unwrap())
        .collect();

    std::thread::scope(|scope| {
        for (level, want) in levels.iter().zip(&expected) {
            let handle = pool.acquire(64, 64).unwrap();
            scope.spawn(move || {
                assert_eq!(&handle.detect(level).unwrap(), want);
            });
        }
    });

    assert_eq!(pool.created(), 1);
    pool.release_all().unwrap();
    assert!(pool.is_empty());
}

#[test]
fn release_refuses_while_a_handle_is_alive() {
    let pool = DetectorPool::new(ExtremaDetectorFactory::default());
    let handle = pool.acquire(32, 32).unwrap();
    assert_eq!(
        pool.release_all(),
        Err(TargetIdxError::PoolInUse {
            width: 32,
            height: 32,
        })
    );
    drop(handle);
    assert!(pool.release_all().is_ok());
}

#[test]
fn points_are_reported_in_full_resolution_coordinates() {
    let level = make_level(80, 80, 3, 0.5);
    let detector = ExtremaDetector::new(80, 80, ExtremaDetectorConfig::default()).unwrap();
    let points = detector.detect(&level).unwrap();
    assert!(points.iter().all(|p| p.x <= 160.0 && p.y <= 160.0));
    assert!(points.iter().all(|p| p.scale == 0.5));
    assert!(points.iter().any(|p| p.sign == ExtremumSign::Maxima));
}
