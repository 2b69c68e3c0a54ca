//! ディレクトリ単位のバッチ処理（回転・明るさ調整・フレーム抽出）

use dataset_prep::color_adjust::adjust_directory;
use dataset_prep::config::{AdjustConfig, ExtractConfig, RotateConfig};
use dataset_prep::frame_extractor::extract_directory;
use dataset_prep::image_rotator::rotate_directory;
use dataset_prep::PrepError;
use image::{Rgb, RgbImage};
use std::fs;

fn pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 7]))
}

#[test]
fn rotate_directory_skips_corrupt_files_and_other_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let original = pattern(5, 3);
    original.save(dir.path().join("a.png")).unwrap();
    original.save(dir.path().join("b.BMP")).unwrap();
    fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();
    fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

    let config = RotateConfig {
        image_dir: dir.path().to_path_buf(),
        ..RotateConfig::default()
    };
    let report = rotate_directory(&config).unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.processed(), 2);
    assert_eq!(report.failed(), 1);

    let rotated = image::open(dir.path().join("a.png")).unwrap().to_rgb8();
    assert_eq!(rotated.get_pixel(4, 2), original.get_pixel(0, 0));
    assert_eq!(fs::read(dir.path().join("notes.txt")).unwrap(), b"keep");

    // 2回目で元に戻る
    rotate_directory(&config).unwrap();
    let restored = image::open(dir.path().join("b.BMP")).unwrap().to_rgb8();
    assert_eq!(restored, original);
}

#[test]
fn adjust_directory_writes_into_new_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    fs::create_dir_all(&input).unwrap();
    pattern(4, 4).save(input.join("x.png")).unwrap();
    pattern(4, 4).save(input.join("y.bmp")).unwrap();

    let config = AdjustConfig {
        input_dir: input.clone(),
        output_dir: dir.path().join("out/enhanced"),
        ..AdjustConfig::default()
    };
    let report = adjust_directory(&config).unwrap();

    assert_eq!(report.processed(), 1);
    assert!(config.output_dir.join("x.png").exists());
    assert!(!config.output_dir.join("y.bmp").exists());
    // 入力は変更しない
    assert_eq!(image::open(input.join("x.png")).unwrap().to_rgb8(), pattern(4, 4));
}

#[test]
fn missing_directories_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = rotate_directory(&RotateConfig {
        image_dir: missing.clone(),
        ..RotateConfig::default()
    })
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PrepError>(),
        Some(PrepError::DirectoryNotFound(_))
    ));

    let err = adjust_directory(&AdjustConfig {
        input_dir: missing.clone(),
        output_dir: dir.path().join("out"),
        ..AdjustConfig::default()
    })
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PrepError>(),
        Some(PrepError::DirectoryNotFound(_))
    ));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn extract_directory_without_videos_is_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("readme.txt"), b"").unwrap();

    let config = ExtractConfig {
        video_dir: dir.path().to_path_buf(),
        output_dir: dir.path().join("frames"),
        ..ExtractConfig::default()
    };
    let report = extract_directory(&config).unwrap();
    assert_eq!(report.total(), 0);
}

#[test]
fn extract_directory_rejects_zero_interval() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExtractConfig {
        video_dir: dir.path().to_path_buf(),
        frame_interval: 0,
        ..ExtractConfig::default()
    };
    let err = extract_directory(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PrepError>(),
        Some(PrepError::InvalidConfig(_))
    ));
}
