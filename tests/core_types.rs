use targetidx::image::ImageView;
use targetidx::lowlevel::{LumaBackend, PyramidConfig, ScalarLuma, ScalePyramid};
use targetidx::{
    GreyImage, PixelFormat, PyramidBuilder, Surface, TargetIdxError, TargetImage,
};

#[test]
fn target_image_rejects_invalid_dimensions() {
    let err = TargetImage::new(vec![0; 4], 0, 1, PixelFormat::Gray)
        .err()
        .unwrap();
    assert_eq!(
        err,
        TargetIdxError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );
}

#[test]
fn target_image_rejects_small_buffer() {
    let err = TargetImage::new(vec![0; 11], 2, 2, PixelFormat::Rgb)
        .err()
        .unwrap();
    assert_eq!(err, TargetIdxError::BufferTooSmall { needed: 12, got: 11 });
}

#[test]
fn image_view_indexes_rows() {
    let data: Vec<u8> = (0..12).collect();
    let view = ImageView::from_slice(&data, 4, 3).unwrap();
    assert_eq!(view.get(1, 2), Some(9));
    assert_eq!(view.get(4, 0), None);
    assert_eq!(view.row(1).unwrap(), &[4, 5, 6, 7]);
    assert_eq!(view.get_clamped(-3, 7), 8);
}

#[test]
fn gray_target_survives_surface_and_luma() {
    let data: Vec<u8> = (0..48).map(|v| (v * 5) as u8).collect();
    let target = TargetImage::new(data.clone(), 8, 6, PixelFormat::Gray).unwrap();
    let surface = Surface::from_target(&target).unwrap();
    assert_eq!(surface.data().len(), 8 * 6 * 4);
    let grey = ScalarLuma.to_grey(&surface).unwrap();
    assert_eq!(grey.data(), data.as_slice());
}

#[test]
fn matching_pyramid_ends_at_full_resolution() {
    let grey = GreyImage::new(vec![128; 400 * 300], 400, 300).unwrap();
    let pyramid = ScalePyramid::default();
    let levels = pyramid.build_matching_pyramid(&grey).unwrap();

    assert_eq!(levels[0].scale, 1.0);
    assert_eq!((levels[0].width, levels[0].height), (400, 300));
    assert!(levels.windows(2).all(|w| w[0].scale > w[1].scale));
    let smallest = levels.last().unwrap();
    assert_eq!(smallest.height, 100);
    assert!(levels.iter().all(|l| l.data.len() == l.width * l.height));
}

#[test]
fn tracking_pyramid_follows_configured_sizes() {
    let grey = GreyImage::new(vec![10; 160 * 320], 160, 320).unwrap();
    let pyramid = ScalePyramid::new(PyramidConfig {
        tracking_sizes: vec![80, 40],
        ..PyramidConfig::default()
    })
    .unwrap();
    let levels = pyramid.build_tracking_pyramid(&grey).unwrap();
    let sizes: Vec<_> = levels.iter().map(|l| (l.width, l.height)).collect();
    assert_eq!(sizes, vec![(80, 160), (40, 80)]);
}

#[test]
fn pyramid_config_is_validated() {
    let err = ScalePyramid::new(PyramidConfig {
        matching_scale_step: 1.0,
        ..PyramidConfig::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, TargetIdxError::InvalidInput(_)));
}
