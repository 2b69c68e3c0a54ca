//! 明るさ・彩度の調整
//!
//! RGB を HSV に変換し、V（明るさ）と S（彩度）に係数を掛けてから RGB に戻す。
//! S と V は 0〜255 の範囲、H は度数で扱う。

use crate::batch::{collect_files, ensure_dir, run_batch, BatchReport};
use crate::config::AdjustConfig;
use crate::image_io::{open_image, save_image};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use tracing::info;

/// HSV の1画素（h: 0〜360度、s, v: 0〜255）
///
/// h は連続値のまま保持し、8bit（0〜180）には量子化しない。
/// 彩度を変えても色相は変換誤差の範囲でしか動かない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

/// RGB → HSV
pub fn rgb_to_hsv(rgb: Rgb<u8>) -> Hsv {
    let [r, g, b] = rgb.0.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv { h, s, v: max }
}

/// HSV → RGB（四捨五入して 8bit に戻す）
pub fn hsv_to_rgb(hsv: Hsv) -> Rgb<u8> {
    let v = hsv.v.clamp(0.0, 255.0);
    let s = (hsv.s / 255.0).clamp(0.0, 1.0);
    let h = hsv.h.rem_euclid(360.0) / 60.0;

    let c = v * s;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_u8 = |value: f32| (value + m).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

/// 8bit 化 → 係数 → 0〜255 にクリップ → 切り捨て
fn scale_channel(value: f32, factor: f32) -> f32 {
    (value.round() * factor).clamp(0.0, 255.0).trunc()
}

/// 1画素の明るさ・彩度を調整
pub fn adjust_pixel(rgb: Rgb<u8>, brightness_factor: f32, saturation_factor: f32) -> Rgb<u8> {
    let hsv = rgb_to_hsv(rgb);
    hsv_to_rgb(Hsv {
        h: hsv.h,
        s: scale_channel(hsv.s, saturation_factor),
        v: scale_channel(hsv.v, brightness_factor),
    })
}

/// 画像全体の明るさ・彩度を調整
pub fn adjust_brightness_saturation(
    image: &RgbImage,
    brightness_factor: f32,
    saturation_factor: f32,
) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = adjust_pixel(*pixel, brightness_factor, saturation_factor);
    }
    out
}

/// 1ファイルを調整して出力ディレクトリに保存
pub fn adjust_image_file(input_path: &Path, config: &AdjustConfig) -> Result<()> {
    let file_name = input_path
        .file_name()
        .with_context(|| format!("ファイル名を取得できません: {}", input_path.display()))?;
    let output_path = config.output_dir.join(file_name);

    let image = open_image(input_path)?.to_rgb8();
    let adjusted =
        adjust_brightness_saturation(&image, config.brightness_factor, config.saturation_factor);

    save_image(
        &DynamicImage::ImageRgb8(adjusted),
        &output_path,
        config.jpeg_quality,
    )
}

/// ディレクトリ内の全画像を調整
pub fn adjust_directory(config: &AdjustConfig) -> Result<BatchReport> {
    config.validate()?;

    let files = collect_files(&config.input_dir, &config.extensions)?;
    ensure_dir(&config.output_dir).with_context(|| {
        format!(
            "出力ディレクトリの作成に失敗しました: {}",
            config.output_dir.display()
        )
    })?;

    info!(
        "{} 個の画像ファイルが見つかりました: {}",
        files.len(),
        config.input_dir.display()
    );
    info!(
        "明るさ係数: {}, 彩度係数: {}",
        config.brightness_factor, config.saturation_factor
    );

    let report = run_batch(&files, |path| adjust_image_file(path, config));
    report.log_summary("明るさ・彩度調整");
    info!("出力先: {}", config.output_dir.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_diff(a: Rgb<u8>, b: Rgb<u8>) -> u8 {
        a.0.iter()
            .zip(b.0.iter())
            .map(|(x, y)| x.abs_diff(*y))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_hsv_of_primaries() {
        let red = rgb_to_hsv(Rgb([255, 0, 0]));
        assert_eq!((red.h, red.s, red.v), (0.0, 255.0, 255.0));

        let green = rgb_to_hsv(Rgb([0, 255, 0]));
        assert_eq!(green.h, 120.0);

        let blue = rgb_to_hsv(Rgb([0, 0, 255]));
        assert_eq!(blue.h, 240.0);

        let gray = rgb_to_hsv(Rgb([90, 90, 90]));
        assert_eq!((gray.h, gray.s, gray.v), (0.0, 0.0, 90.0));
    }

    #[test]
    fn test_unit_factors_are_identity_within_quantization() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(17) {
                for b in (0..=255u16).step_by(51) {
                    let rgb = Rgb([r as u8, g as u8, b as u8]);
                    let out = adjust_pixel(rgb, 1.0, 1.0);
                    assert!(
                        channel_diff(rgb, out) <= 2,
                        "{:?} -> {:?}",
                        rgb,
                        out
                    );
                }
            }
        }
    }

    #[test]
    fn test_brightness_is_clipped() {
        let out = adjust_pixel(Rgb([200, 200, 200]), 2.0, 1.0);
        assert_eq!(out, Rgb([255, 255, 255]));
    }

    #[test]
    fn test_zero_saturation_gives_gray() {
        let out = adjust_pixel(Rgb([200, 40, 90]), 1.0, 0.0);
        assert_eq!(out, Rgb([200, 200, 200]));
    }

    #[test]
    fn test_saturation_increase_widens_spread() {
        let input = Rgb([150, 120, 100]);
        let out = adjust_pixel(input, 1.0, 1.4);
        let spread = |p: Rgb<u8>| p.0.iter().max().unwrap() - p.0.iter().min().unwrap();
        assert!(spread(out) > spread(input));
        assert_eq!(out.0[0], 150);
    }

    #[test]
    fn test_adjust_image_file_writes_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("in");
        std::fs::create_dir_all(&input_dir).unwrap();
        let input = input_dir.join("a.png");
        RgbImage::from_pixel(3, 2, Rgb([100, 50, 25])).save(&input).unwrap();

        let config = AdjustConfig {
            input_dir,
            output_dir: dir.path().join("out"),
            brightness_factor: 1.0,
            saturation_factor: 1.0,
            ..AdjustConfig::default()
        };
        std::fs::create_dir_all(&config.output_dir).unwrap();
        adjust_image_file(&input, &config).unwrap();

        let out = open_image(&config.output_dir.join("a.png")).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (3, 2));
        assert!(channel_diff(*out.get_pixel(0, 0), Rgb([100, 50, 25])) <= 2);
    }
}
