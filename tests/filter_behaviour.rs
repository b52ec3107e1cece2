use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use targetidx::{FilterConfig, OneEuroFilter, TargetIdxError};

fn filter(min_cutoff: f64, beta: f64) -> OneEuroFilter {
    OneEuroFilter::new(FilterConfig {
        min_cutoff,
        beta,
        d_cutoff: 1.0,
    })
    .unwrap()
}

#[test]
fn constant_input_converges() {
    let mut f = filter(1.0, 0.0);
    f.filter(0.0, &[0.0, 10.0]).unwrap();
    let mut last = Vec::new();
    for step in 1..=200 {
        last = f.filter(step as f64 * 0.1, &[5.0, -3.0]).unwrap().to_vec();
    }
    assert!((last[0] - 5.0).abs() < 1e-6);
    assert!((last[1] + 3.0).abs() < 1e-6);
}

#[test]
fn higher_beta_follows_a_ramp_with_less_lag() {
    let lag = |beta: f64| {
        let mut f = filter(1.0, beta);
        let mut out = 0.0;
        for step in 0..=500 {
            let t = step as f64 * 0.01;
            out = f.filter(t, &[t]).unwrap()[0];
        }
        5.0 - out
    };
    let slow = lag(0.0);
    let fast = lag(10.0);
    assert!(slow > 0.0);
    assert!(fast >= 0.0);
    assert!(fast < slow);
}

#[test]
fn jitter_is_attenuated() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut f = filter(0.5, 0.0);
    let mut raw_energy = 0.0;
    let mut out_energy = 0.0;
    for step in 0..2000 {
        let noise: f64 = rng.random_range(-1.0..1.0);
        let out = f.filter(step as f64 * 0.01, &[noise]).unwrap()[0];
        if step >= 1000 {
            raw_energy += noise * noise;
            out_energy += out * out;
        }
    }
    assert!(out_energy < 0.25 * raw_energy);
}

#[test]
fn snapshot_is_stable_until_released() {
    let mut f = filter(1.0, 0.0);
    let first = f.filter(0.0, &[1.0, 2.0]).unwrap().to_vec();
    let second = f.filter(1.0, &[3.0, 4.0]).unwrap().to_vec();
    assert_eq!(first, vec![1.0, 2.0]);
    assert_ne!(second, first);
    let third = f.filter(2.0, &[3.0, 4.0]).unwrap();
    assert!(third.iter().zip(&second).all(|(a, b)| a >= b));
}

#[test]
fn invalid_config_is_rejected() {
    let err = OneEuroFilter::new(FilterConfig {
        min_cutoff: 0.0,
        ..FilterConfig::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, TargetIdxError::InvalidFilterConfig(_)));

    let err = OneEuroFilter::new(FilterConfig {
        beta: -1.0,
        ..FilterConfig::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, TargetIdxError::InvalidFilterConfig(_)));
}
