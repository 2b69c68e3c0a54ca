use crate::batch::{collect_files, run_batch, BatchReport};
use crate::config::RotateConfig;
use crate::image_io::{open_image, save_image};
use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::Path;
use tracing::info;

/// 画像を180度回転
pub fn rotate180(img: &DynamicImage) -> DynamicImage {
    img.rotate180()
}

/// 1枚の画像を180度回転して同じパスに上書き保存
pub fn rotate_image_file(path: &Path, jpeg_quality: u8) -> Result<()> {
    let img = open_image(path)?;
    let rotated = rotate180(&img);
    save_image(&rotated, path, jpeg_quality)
        .with_context(|| format!("回転画像の保存に失敗: {}", path.display()))
}

/// ディレクトリ内の全画像を180度回転（上書き）
pub fn rotate_directory(config: &RotateConfig) -> Result<BatchReport> {
    config.validate()?;

    let files = collect_files(&config.image_dir, &config.extensions)?;
    info!(
        "{} の画像を処理します（{}個）",
        config.image_dir.display(),
        files.len()
    );

    let report = run_batch(&files, |path| rotate_image_file(path, config.jpeg_quality));
    report.log_summary("画像回転");
    Ok(report)
}
