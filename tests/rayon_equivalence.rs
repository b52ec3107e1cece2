#![cfg(feature = "rayon")]

use targetidx::lowlevel::{LumaBackend, ParallelLuma, ScalarLuma};
use targetidx::{CompileConfig, Compiler, PixelFormat, Surface, TargetImage};

fn make_rgba(width: usize, height: usize, seed: usize) -> TargetImage {
    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 11 + seed) ^ (y * 3) ^ (x * y)) & 0xFF;
            data.extend_from_slice(&[
                value as u8,
                (value * 3 & 0xFF) as u8,
                255 - value as u8,
                255,
            ]);
        }
    }
    TargetImage::new(data, width, height, PixelFormat::Rgba).unwrap()
}

#[test]
fn parallel_compile_matches_sequential() {
    let images: Vec<TargetImage> = (0..4)
        .map(|i| make_rgba(120 + i * 30, 110 + i * 10, i * 17))
        .collect();

    let mut sequential = Compiler::standard().with_config(CompileConfig {
        yield_interval: 3,
        parallel: false,
    });
    let mut parallel = Compiler::standard().with_config(CompileConfig {
        yield_interval: 3,
        parallel: true,
    });

    let seq = sequential.compile(&images, |_| {}).unwrap().to_vec();
    let par = parallel.compile(&images, |_| {}).unwrap().to_vec();
    assert_eq!(seq, par);
    assert_eq!(
        sequential.export_data().unwrap(),
        parallel.export_data().unwrap()
    );
}

#[test]
fn parallel_luma_matches_scalar() {
    let image = make_rgba(97, 61, 5);
    let surface = Surface::from_target(&image).unwrap();
    let scalar = ScalarLuma.to_grey(&surface).unwrap();
    let parallel = ParallelLuma.to_grey(&surface).unwrap();
    assert_eq!(scalar.data(), parallel.data());
}
