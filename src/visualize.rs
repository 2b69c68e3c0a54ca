use crate::annotation::{image_path_candidates, list_json_files, resolve_image_path, AnnotationRecord};
use crate::batch::{ensure_dir, run_batch, BatchReport};
use crate::config::VisualizeConfig;
use crate::error::PrepError;
use crate::image_io::open_image;
use crate::mask_compositor::compose_mask;
use crate::overlay::{render_panels, OverlayStyle};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 元画像の取得元
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    File(PathBuf),
    /// JSON の imageData
    Embedded,
}

/// 可視化1件の結果
#[derive(Debug, Clone)]
pub struct VisualizationSummary {
    pub json_path: PathBuf,
    pub image_source: ImageSource,
    pub width: u32,
    pub height: u32,
    pub contributing_shapes: usize,
    pub skipped_shapes: usize,
    pub max_mask_value: u8,
    pub overlay_path: PathBuf,
    pub mask_path: Option<PathBuf>,
}

impl From<&VisualizeConfig> for OverlayStyle {
    fn from(config: &VisualizeConfig) -> Self {
        Self {
            tint: Rgb(config.tint),
            alpha: config.alpha,
        }
    }
}

/// 元画像を読み込む
///
/// 優先順: 明示指定 > imagePath の解決結果 > 埋め込み imageData
pub fn load_source_image(
    json_path: &Path,
    record: &AnnotationRecord,
    image_override: Option<&Path>,
) -> Result<(RgbImage, ImageSource)> {
    if let Some(path) = image_override {
        if !path.is_file() {
            return Err(PrepError::ImageNotFound(path.to_path_buf()).into());
        }
        let image = open_image(path)?.to_rgb8();
        return Ok((image, ImageSource::File(path.to_path_buf())));
    }

    if let Some(path) = resolve_image_path(json_path, &record.image_path) {
        let image = open_image(&path)?.to_rgb8();
        return Ok((image, ImageSource::File(path)));
    }

    if let Some(embedded) = record.embedded_image() {
        let image = embedded.context("埋め込み画像（imageData）のデコードに失敗しました")?;
        return Ok((image.to_rgb8(), ImageSource::Embedded));
    }

    let missing = image_path_candidates(json_path, &record.image_path)
        .into_iter()
        .next()
        .unwrap_or_else(|| PathBuf::from(&record.image_path));
    Err(PrepError::ImageNotFound(missing).into())
}

/// アノテーション1件を可視化して画像として保存
pub fn visualize_annotation(
    json_path: &Path,
    image_override: Option<&Path>,
    config: &VisualizeConfig,
) -> Result<VisualizationSummary> {
    visualize_annotation_into(json_path, image_override, config, &config.output_dir)
}

/// 出力先を指定して可視化
pub fn visualize_annotation_into(
    json_path: &Path,
    image_override: Option<&Path>,
    config: &VisualizeConfig,
    output_dir: &Path,
) -> Result<VisualizationSummary> {
    let record = AnnotationRecord::load(json_path)?;
    let (image, image_source) = load_source_image(json_path, &record, image_override)?;
    let (width, height) = image.dimensions();

    if let (Some(w), Some(h)) = (record.image_width, record.image_height) {
        if (w, h) != (width, height) {
            warn!(
                "JSON の画像サイズ {}x{} と実際の画像サイズ {}x{} が一致しません",
                w, h, width, height
            );
        }
    }

    let composition = compose_mask(&record.shapes, width, height);

    let stem = json_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("annotation");
    ensure_dir(output_dir).with_context(|| {
        format!(
            "出力ディレクトリの作成に失敗しました: {}",
            output_dir.display()
        )
    })?;

    let panels = render_panels(&image, &composition.mask, &OverlayStyle::from(config))
        .context("可視化画像の作成に失敗しました")?;
    let overlay_path = output_dir.join(format!("{}_overlay.png", stem));
    panels
        .save(&overlay_path)
        .with_context(|| format!("画像の保存に失敗しました: {}", overlay_path.display()))?;

    let mask_path = if config.save_mask {
        let path = output_dir.join(format!("{}_mask.png", stem));
        composition
            .mask
            .save(&path)
            .with_context(|| format!("マスクの保存に失敗しました: {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    info!("可視化完了: {} -> {}", json_path.display(), overlay_path.display());

    Ok(VisualizationSummary {
        json_path: json_path.to_path_buf(),
        image_source,
        width,
        height,
        contributing_shapes: composition.contributing,
        skipped_shapes: composition.skipped.len(),
        max_mask_value: composition.max_value(),
        overlay_path,
        mask_path,
    })
}

/// アノテーションディレクトリ内のサブディレクトリ構成を出力側にも再現する
///
/// `a/IMG_1.json` と `b/IMG_1.json` が同じ出力ファイルにならないようにする。
pub fn mirrored_output_dir(json_path: &Path, annotation_dir: &Path, output_dir: &Path) -> PathBuf {
    json_path
        .parent()
        .and_then(|parent| parent.strip_prefix(annotation_dir).ok())
        .map(|relative| output_dir.join(relative))
        .unwrap_or_else(|| output_dir.to_path_buf())
}

/// ディレクトリ内の全 JSON を可視化
pub fn visualize_directory(config: &VisualizeConfig) -> Result<BatchReport> {
    config.validate()?;

    let files = list_json_files(&config.annotation_dir)?;
    if files.is_empty() {
        warn!(
            "{} に JSON ファイルが見つかりませんでした",
            config.annotation_dir.display()
        );
        return Ok(BatchReport::default());
    }

    info!("{}個の JSON ファイルを処理します", files.len());
    let report = run_batch(&files, |path| {
        let output_dir = mirrored_output_dir(path, &config.annotation_dir, &config.output_dir);
        visualize_annotation_into(path, None, config, &output_dir).map(|_| ())
    });
    report.log_summary("アノテーション可視化");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_output_dir() {
        let annotations = Path::new("data/mask_json");
        let out = Path::new("data/overlays");

        assert_eq!(
            mirrored_output_dir(&annotations.join("IMG_1.json"), annotations, out),
            PathBuf::from("data/overlays")
        );
        assert_eq!(
            mirrored_output_dir(&annotations.join("a/IMG_1.json"), annotations, out),
            PathBuf::from("data/overlays/a")
        );
        assert_ne!(
            mirrored_output_dir(&annotations.join("a/IMG_1.json"), annotations, out),
            mirrored_output_dir(&annotations.join("b/IMG_1.json"), annotations, out)
        );
        assert_eq!(
            mirrored_output_dir(Path::new("elsewhere/IMG_1.json"), annotations, out),
            PathBuf::from("data/overlays")
        );
    }
}
