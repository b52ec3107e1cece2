//! Compilation of target images into matching and tracking records.
//!
//! A [`Compiler`] runs one session: every target is converted to grayscale,
//! decomposed into a matching and a tracking pyramid, and then matching
//! extraction runs per target (in parallel with the `rayon` feature and
//! [`CompileConfig::parallel`]). Levels inside one target are processed in
//! order. Detectors come from a [`DetectorPool`] that lives for the session
//! and is released only after every target task has joined.

mod hooks;
mod progress;

pub use hooks::{StandardHooks, SurfaceHook, TrackingHook};
pub use progress::{NoSuspend, Suspend, ThreadYield};

use crate::bundle::{self, VersionSkip};
use crate::cluster::{ClusterIndexBuilder, MedoidClusterBuilder};
use crate::detect::{partition_by_sign, DetectorFactory, ExtremaDetectorFactory, FeatureDetector};
use crate::image::pyramid::{PyramidBuilder, PyramidLevel, ScalePyramid};
use crate::image::{LumaBackend, ScalarLuma, TargetImage};
use crate::pool::DetectorPool;
use crate::record::{CompiledTarget, MatchingLevel, MatchingRecord, TargetDims};
use crate::trace::{trace_event, trace_span};
use crate::util::{TargetIdxError, TargetIdxResult};
use progress::ProgressReporter;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Scheduling options for a compile session.
#[derive(Clone, Debug)]
pub struct CompileConfig {
    /// Suspend after this many processed levels within a target; 0 disables it.
    pub yield_interval: usize,
    /// Run target tasks on the rayon pool (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            yield_interval: 3,
            parallel: true,
        }
    }
}

/// Builder that checks every required pipeline component is present.
pub struct CompilerBuilder<F: DetectorFactory> {
    factory: Option<F>,
    pyramid: Option<Box<dyn PyramidBuilder>>,
    cluster: Option<Box<dyn ClusterIndexBuilder>>,
    surface_hook: Option<Box<dyn SurfaceHook>>,
    tracking_hook: Option<Box<dyn TrackingHook>>,
    luma: Box<dyn LumaBackend>,
    suspend: Box<dyn Suspend>,
    cfg: CompileConfig,
}

impl<F: DetectorFactory> Default for CompilerBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: DetectorFactory> CompilerBuilder<F> {
    /// Starts a builder with the scalar luma backend and no suspension.
    pub fn new() -> Self {
        Self {
            factory: None,
            pyramid: None,
            cluster: None,
            surface_hook: None,
            tracking_hook: None,
            luma: Box::new(ScalarLuma),
            suspend: Box::new(NoSuspend),
            cfg: CompileConfig::default(),
        }
    }

    /// Sets the factory that creates detectors for the session pool.
    pub fn detector_factory(mut self, factory: F) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the pyramid builder.
    pub fn pyramid_builder(mut self, pyramid: impl PyramidBuilder + 'static) -> Self {
        self.pyramid = Some(Box::new(pyramid));
        self
    }

    /// Sets the cluster index builder.
    pub fn cluster_builder(mut self, cluster: impl ClusterIndexBuilder + 'static) -> Self {
        self.cluster = Some(Box::new(cluster));
        self
    }

    /// Sets the surface-preparation hook.
    pub fn surface_hook(mut self, hook: impl SurfaceHook + 'static) -> Self {
        self.surface_hook = Some(Box::new(hook));
        self
    }

    /// Sets the tracking-record assembly hook.
    pub fn tracking_hook(mut self, hook: impl TrackingHook + 'static) -> Self {
        self.tracking_hook = Some(Box::new(hook));
        self
    }

    /// Installs [`StandardHooks`] for both lifecycle hooks.
    pub fn standard_hooks(self) -> Self {
        self.surface_hook(StandardHooks).tracking_hook(StandardHooks)
    }

    /// Replaces the luminosity backend.
    pub fn luma_backend(mut self, luma: impl LumaBackend + 'static) -> Self {
        self.luma = Box::new(luma);
        self
    }

    /// Replaces the suspension point implementation.
    pub fn suspend(mut self, suspend: impl Suspend + 'static) -> Self {
        self.suspend = Box::new(suspend);
        self
    }

    /// Sets the scheduling options.
    pub fn config(mut self, cfg: CompileConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Builds the compiler, failing with [`TargetIdxError::MissingComponent`]
    /// for the first absent component.
    pub fn build(self) -> TargetIdxResult<Compiler<F>> {
        let missing = |component| TargetIdxError::MissingComponent { component };
        Ok(Compiler {
            factory: Some(self.factory.ok_or_else(|| missing("detector_factory"))?),
            pyramid: self.pyramid.ok_or_else(|| missing("pyramid_builder"))?,
            cluster: self.cluster.ok_or_else(|| missing("cluster_builder"))?,
            surface_hook: self.surface_hook.ok_or_else(|| missing("surface_hook"))?,
            tracking_hook: self.tracking_hook.ok_or_else(|| missing("tracking_hook"))?,
            luma: self.luma,
            suspend: self.suspend,
            cfg: self.cfg,
            data: None,
        })
    }
}

/// Pyramids prepared for one target before extraction starts.
struct PreparedTarget {
    dims: TargetDims,
    matching: Vec<PyramidLevel>,
    tracking: Vec<PyramidLevel>,
}

/// Single-session compilation pipeline.
pub struct Compiler<F: DetectorFactory> {
    factory: Option<F>,
    pyramid: Box<dyn PyramidBuilder>,
    cluster: Box<dyn ClusterIndexBuilder>,
    surface_hook: Box<dyn SurfaceHook>,
    tracking_hook: Box<dyn TrackingHook>,
    luma: Box<dyn LumaBackend>,
    suspend: Box<dyn Suspend>,
    cfg: CompileConfig,
    data: Option<Vec<CompiledTarget>>,
}

impl Compiler<ExtremaDetectorFactory> {
    /// A compiler wired with the built-in collaborators and default settings.
    pub fn standard() -> Self {
        Self {
            factory: Some(ExtremaDetectorFactory::default()),
            pyramid: Box::new(ScalePyramid::default()),
            cluster: Box::new(MedoidClusterBuilder::default()),
            surface_hook: Box::new(StandardHooks),
            tracking_hook: Box::new(StandardHooks),
            luma: Box::new(ScalarLuma),
            suspend: Box::new(NoSuspend),
            cfg: CompileConfig::default(),
            data: None,
        }
    }
}

impl<F: DetectorFactory> Compiler<F> {
    /// Starts a builder for a custom pipeline.
    pub fn builder() -> CompilerBuilder<F> {
        CompilerBuilder::new()
    }

    /// Replaces the scheduling options.
    pub fn with_config(mut self, cfg: CompileConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Compiles `images` into one record per target, in input order.
    ///
    /// `on_progress` receives percentages in `0..=100`. The whole call fails
    /// if any target fails; nothing is stored in that case. A compiler runs
    /// at most one session.
    pub fn compile<P>(
        &mut self,
        images: &[TargetImage],
        on_progress: P,
    ) -> TargetIdxResult<&[CompiledTarget]>
    where
        P: Fn(f32) + Sync,
    {
        if self.factory.is_none() {
            return Err(TargetIdxError::AlreadyCompiled);
        }
        if images.is_empty() {
            return Err(TargetIdxError::EmptyTargetSet);
        }
        let factory = self.factory.take().ok_or(TargetIdxError::AlreadyCompiled)?;
        let _span = trace_span!("compile", targets = images.len()).entered();

        let prepared = images
            .iter()
            .enumerate()
            .map(|(idx, image)| self.prepare(idx, image).map_err(|err| target_failed(idx, err)))
            .collect::<TargetIdxResult<Vec<_>>>()?;

        let pool = DetectorPool::new(factory);
        let progress = ProgressReporter::new(&on_progress, images.len());
        let extracted = self.extract_all(&pool, &prepared, &progress);
        // Every task has joined here, so no handle can outlive the pool.
        let released = pool.release_all();
        let matching = extracted?;
        released?;
        trace_event!("detectors_used", created = pool.created());

        let mut targets = Vec::with_capacity(prepared.len());
        for (idx, (target, matching_data)) in prepared.into_iter().zip(matching).enumerate() {
            let tracking_data = self
                .tracking_hook
                .assemble_tracking(idx, target.tracking)
                .map_err(|err| target_failed(idx, err))?;
            progress.tracking(idx);
            targets.push(CompiledTarget {
                target_image: target.dims,
                matching_data,
                tracking_data,
            });
        }

        Ok(self.data.insert(targets).as_slice())
    }

    /// Records from the last compile or import, if any.
    pub fn data(&self) -> Option<&[CompiledTarget]> {
        self.data.as_deref()
    }

    /// Serializes the compiled records into a bundle.
    pub fn export_data(&self) -> TargetIdxResult<Vec<u8>> {
        let data = self.data.as_deref().ok_or(TargetIdxError::NotCompiled)?;
        bundle::export(data)
    }

    /// Loads records from a bundle, replacing any stored records.
    ///
    /// A bundle from another format version stores no records and returns
    /// the skipped versions.
    pub fn import_data(&mut self, bytes: &[u8]) -> TargetIdxResult<Option<VersionSkip>> {
        let imported = bundle::import(bytes)?;
        self.data = Some(imported.targets);
        Ok(imported.skipped)
    }

    fn prepare(&self, target: usize, image: &TargetImage) -> TargetIdxResult<PreparedTarget> {
        let _span = trace_span!("prepare_target", target = target).entered();
        let surface = self.surface_hook.prepare_surface(target, image)?;
        if (surface.width(), surface.height()) != (image.width(), image.height()) {
            return Err(TargetIdxError::InvalidInput(
                "surface size differs from target size",
            ));
        }
        let grey = self.luma.to_grey(&surface)?;
        let matching = self.pyramid.build_matching_pyramid(&grey)?;
        if matching.is_empty() {
            return Err(TargetIdxError::InvalidInput("matching pyramid has no levels"));
        }
        let tracking = self.pyramid.build_tracking_pyramid(&grey)?;
        Ok(PreparedTarget {
            dims: TargetDims {
                width: image.width(),
                height: image.height(),
            },
            matching,
            tracking,
        })
    }

    fn extract_all<P: Fn(f32) + Sync>(
        &self,
        pool: &DetectorPool<F>,
        prepared: &[PreparedTarget],
        progress: &ProgressReporter<'_, P>,
    ) -> TargetIdxResult<Vec<MatchingRecord>> {
        let task = |(idx, target): (usize, &PreparedTarget)| {
            self.extract_matching(pool, idx, &target.matching, progress)
                .map_err(|err| target_failed(idx, err))
        };

        #[cfg(feature = "rayon")]
        if self.cfg.parallel && prepared.len() > 1 {
            return prepared.par_iter().enumerate().map(&task).collect();
        }

        prepared.iter().enumerate().map(&task).collect()
    }

    fn extract_matching<P: Fn(f32) + Sync>(
        &self,
        pool: &DetectorPool<F>,
        target: usize,
        levels: &[PyramidLevel],
        progress: &ProgressReporter<'_, P>,
    ) -> TargetIdxResult<MatchingRecord> {
        let _span =
            trace_span!("extract_matching", target = target, levels = levels.len()).entered();
        let mut out = Vec::with_capacity(levels.len());
        for (idx, level) in levels.iter().enumerate() {
            let points = pool.acquire(level.width, level.height)?.detect(level)?;
            let (maxima_points, minima_points) = partition_by_sign(points);
            let maxima_cluster = self.cluster.build(&maxima_points)?;
            let minima_cluster = self.cluster.build(&minima_points)?;
            out.push(MatchingLevel {
                scale: level.scale,
                width: level.width,
                height: level.height,
                maxima_points,
                minima_points,
                maxima_cluster,
                minima_cluster,
            });

            let done = idx + 1;
            progress.matching(target, done, levels.len());
            if self.cfg.yield_interval > 0 && done % self.cfg.yield_interval == 0 {
                self.suspend.suspend();
            }
        }

        let record = MatchingRecord { levels: out };
        trace_event!("target_extracted", target = target, points = record.point_count());
        Ok(record)
    }
}

fn target_failed(target: usize, err: TargetIdxError) -> TargetIdxError {
    match err {
        TargetIdxError::TargetFailed { .. } => err,
        other => TargetIdxError::TargetFailed {
            target,
            reason: other.to_string(),
        },
    }
}
