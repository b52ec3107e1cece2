//! Built-in difference-of-box extrema detector.
//!
//! The response at each pixel is the mean over a small box minus the mean
//! over a larger box, both read from an integral image. Strict 3x3 extrema
//! whose magnitude passes the threshold become feature points; the strongest
//! `max_points_per_sign` of each sign are kept. Orientation comes from the
//! intensity centroid and the descriptor is a steered binary comparison
//! pattern packed into `u32` words.

use crate::detect::{DetectorFactory, ExtremumSign, FeatureDetector, FeaturePoint};
use crate::image::pyramid::PyramidLevel;
use crate::image::ImageView;
use crate::util::math::Lcg;
use crate::util::{TargetIdxError, TargetIdxResult};

/// Number of comparison pairs in the descriptor pattern.
const PATTERN_PAIRS: usize = 256;
const PATTERN_SEED: u64 = 0x5eed_f00d;

/// Configuration for [`ExtremaDetector`].
#[derive(Clone, Debug)]
pub struct ExtremaDetectorConfig {
    /// Half size of the inner box.
    pub inner_radius: usize,
    /// Half size of the outer box.
    pub outer_radius: usize,
    /// Minimum absolute response for an extremum.
    pub threshold: f32,
    /// Maximum points kept per extremum sign and level.
    pub max_points_per_sign: usize,
    /// Radius of the orientation and descriptor patch.
    pub patch_radius: usize,
}

impl Default for ExtremaDetectorConfig {
    fn default() -> Self {
        Self {
            inner_radius: 1,
            outer_radius: 3,
            threshold: 4.0,
            max_points_per_sign: 400,
            patch_radius: 8,
        }
    }
}

/// Difference-of-box detector bound to one level size.
#[derive(Clone, Debug)]
pub struct ExtremaDetector {
    width: usize,
    height: usize,
    cfg: ExtremaDetectorConfig,
    pattern: Vec<[i32; 4]>,
}

impl ExtremaDetector {
    /// Creates a detector for `width x height` levels.
    pub fn new(width: usize, height: usize, cfg: ExtremaDetectorConfig) -> TargetIdxResult<Self> {
        if width == 0 || height == 0 {
            return Err(TargetIdxError::InvalidDimensions { width, height });
        }
        if cfg.inner_radius >= cfg.outer_radius {
            return Err(TargetIdxError::InvalidInput(
                "inner_radius must be smaller than outer_radius",
            ));
        }
        if cfg.patch_radius == 0 {
            return Err(TargetIdxError::InvalidInput("patch_radius must be positive"));
        }

        let span = 2 * cfg.patch_radius + 1;
        let radius = cfg.patch_radius as i32;
        let mut rng = Lcg::new(PATTERN_SEED);
        let pattern = (0..PATTERN_PAIRS)
            .map(|_| {
                let mut offset = || rng.next_below(span) as i32 - radius;
                [offset(), offset(), offset(), offset()]
            })
            .collect();

        Ok(Self {
            width,
            height,
            cfg,
            pattern,
        })
    }

    /// Returns the level size this detector accepts.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn response_map(&self, view: ImageView<'_>) -> Vec<f32> {
        let integral = Integral::build(view);
        let mut response = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let inner = integral.box_mean(x, y, self.cfg.inner_radius);
                let outer = integral.box_mean(x, y, self.cfg.outer_radius);
                response.push(inner - outer);
            }
        }
        response
    }

    fn orientation(&self, view: ImageView<'_>, x: usize, y: usize) -> f32 {
        let r = self.cfg.patch_radius as isize;
        let (cx, cy) = (x as isize, y as isize);
        let mut m01 = 0.0f32;
        let mut m10 = 0.0f32;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let value = f32::from(view.get_clamped(cx + dx, cy + dy));
                m10 += dx as f32 * value;
                m01 += dy as f32 * value;
            }
        }
        m01.atan2(m10)
    }

    fn descriptor(&self, view: ImageView<'_>, x: usize, y: usize, angle: f32) -> Vec<u32> {
        let (sin, cos) = angle.sin_cos();
        let (cx, cy) = (x as f32, y as f32);
        let sample = |ox: i32, oy: i32| {
            let rx = cos * ox as f32 - sin * oy as f32;
            let ry = sin * ox as f32 + cos * oy as f32;
            view.get_clamped((cx + rx).round() as isize, (cy + ry).round() as isize)
        };

        let mut words = vec![0u32; PATTERN_PAIRS / 32];
        for (bit, pair) in self.pattern.iter().enumerate() {
            if sample(pair[0], pair[1]) < sample(pair[2], pair[3]) {
                words[bit / 32] |= 1 << (bit % 32);
            }
        }
        words
    }
}

impl FeatureDetector for ExtremaDetector {
    fn detect(&self, level: &PyramidLevel) -> TargetIdxResult<Vec<FeaturePoint>> {
        if (level.width, level.height) != (self.width, self.height) {
            return Err(TargetIdxError::InvalidInput(
                "level size does not match detector size",
            ));
        }
        let view = level.view()?;
        let response = self.response_map(view);

        let mut maxima = Vec::new();
        let mut minima = Vec::new();
        let w = self.width;
        for y in 1..self.height.saturating_sub(1) {
            for x in 1..w.saturating_sub(1) {
                let value = response[y * w + x];
                if value.abs() < self.cfg.threshold {
                    continue;
                }
                let mut is_max = true;
                let mut is_min = true;
                for ny in y - 1..=y + 1 {
                    for nx in x - 1..=x + 1 {
                        if nx == x && ny == y {
                            continue;
                        }
                        let other = response[ny * w + nx];
                        is_max &= value > other;
                        is_min &= value < other;
                    }
                }
                if is_max {
                    maxima.push((x, y, value.abs()));
                } else if is_min {
                    minima.push((x, y, value.abs()));
                }
            }
        }

        let mut points = Vec::new();
        for (candidates, sign) in [
            (&mut maxima, ExtremumSign::Maxima),
            (&mut minima, ExtremumSign::Minima),
        ] {
            candidates.sort_by(|a, b| {
                b.2.total_cmp(&a.2)
                    .then_with(|| a.1.cmp(&b.1))
                    .then_with(|| a.0.cmp(&b.0))
            });
            candidates.truncate(self.cfg.max_points_per_sign);
            for &(x, y, _) in candidates.iter() {
                let angle = self.orientation(view, x, y);
                points.push(FeaturePoint {
                    x: x as f32 / level.scale,
                    y: y as f32 / level.scale,
                    scale: level.scale,
                    angle,
                    sign,
                    descriptor: self.descriptor(view, x, y, angle),
                });
            }
        }
        Ok(points)
    }
}

/// Factory producing [`ExtremaDetector`]s with a shared configuration.
#[derive(Clone, Debug, Default)]
pub struct ExtremaDetectorFactory {
    cfg: ExtremaDetectorConfig,
}

impl ExtremaDetectorFactory {
    /// Creates a factory with the given configuration.
    pub fn new(cfg: ExtremaDetectorConfig) -> Self {
        Self { cfg }
    }
}

impl DetectorFactory for ExtremaDetectorFactory {
    type Detector = ExtremaDetector;

    fn create(&self, width: usize, height: usize) -> TargetIdxResult<ExtremaDetector> {
        ExtremaDetector::new(width, height, self.cfg.clone())
    }
}

/// Summed-area table with one row and column of zero padding.
struct Integral {
    sums: Vec<u64>,
    width: usize,
    height: usize,
}

impl Integral {
    fn build(view: ImageView<'_>) -> Self {
        let (width, height) = (view.width(), view.height());
        let stride = width + 1;
        let mut sums = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0u64;
            for x in 0..width {
                row_sum += u64::from(view.as_slice()[y * width + x]);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            }
        }
        Self {
            sums,
            width,
            height,
        }
    }

    fn box_mean(&self, x: usize, y: usize, radius: usize) -> f32 {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(self.width);
        let y1 = (y + radius + 1).min(self.height);
        let stride = self.width + 1;
        let total = self.sums[y1 * stride + x1] + self.sums[y0 * stride + x0]
            - self.sums[y0 * stride + x1]
            - self.sums[y1 * stride + x0];
        total as f32 / ((x1 - x0) * (y1 - y0)) as f32
    }
}
