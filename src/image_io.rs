use crate::error::{PrepError, PrepResult};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// 画像ファイルを開く
pub fn open_image(path: &Path) -> PrepResult<DynamicImage> {
    image::open(path).map_err(|source| PrepError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn is_jpeg(path: &Path) -> bool {
    matches!(
        ImageFormat::from_path(path),
        Ok(ImageFormat::Jpeg)
    )
}

/// 拡張子に応じた形式で画像を保存
///
/// JPEG は指定品質で書き出す（アルファは落とす）。それ以外は image クレートの既定。
pub fn save_image(img: &DynamicImage, path: &Path, jpeg_quality: u8) -> anyhow::Result<()> {
    use anyhow::Context;

    if is_jpeg(path) {
        let file = File::create(path)
            .with_context(|| format!("ファイルの作成に失敗: {}", path.display()))?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), jpeg_quality);
        let rgb = match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img.clone(),
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        };
        rgb.write_with_encoder(encoder)
            .with_context(|| format!("JPEG画像の書き込みに失敗しました: {}", path.display()))?;
    } else {
        img.save(path)
            .with_context(|| format!("画像の保存に失敗しました: {}", path.display()))?;
    }

    Ok(())
}
