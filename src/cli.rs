//! 各ツール共通のコマンドライン引数
//!
//! 単体のバイナリ（`rotate_images` など）と `dataset_prep` のサブコマンドの
//! 両方から使う。指定された引数は設定ファイルの値を上書きする。

use crate::annotation::list_json_files;
use crate::batch::{BatchReport, FileOutcome, FileStatus};
use crate::color_adjust::adjust_directory;
use crate::config::{AdjustConfig, AppConfig, ExtractConfig, RotateConfig, VisualizeConfig};
use crate::frame_extractor::extract_directory;
use crate::image_rotator::rotate_directory;
use crate::visualize::{visualize_annotation, visualize_directory};
use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

/// 設定ファイルの指定
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// 設定ファイル（省略時は dataset_prep.toml または DATASET_PREP_CONFIG）
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<AppConfig> {
        Ok(AppConfig::load_from(self.config.as_deref())?)
    }
}

/// 画像回転の引数
#[derive(Debug, Clone, Default, Args)]
pub struct RotateArgs {
    /// 対象ディレクトリ（画像は上書きされる）
    pub image_dir: Option<PathBuf>,

    /// 対象とする拡張子（カンマ区切り）
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// JPEG の保存品質
    #[arg(long)]
    pub jpeg_quality: Option<u8>,
}

impl RotateArgs {
    pub fn apply(&self, config: &mut RotateConfig) {
        if let Some(dir) = &self.image_dir {
            config.image_dir = dir.clone();
        }
        if let Some(extensions) = &self.extensions {
            config.extensions = extensions.clone();
        }
        if let Some(quality) = self.jpeg_quality {
            config.jpeg_quality = quality;
        }
    }

    pub fn run(&self, app: &AppConfig) -> Result<BatchReport> {
        let mut config = app.rotate.clone();
        self.apply(&mut config);

        println!("=== 画像回転（180度） ===");
        println!("対象ディレクトリ: {}", config.image_dir.display());

        let report = rotate_directory(&config)?;
        print_report(&report);
        Ok(report)
    }
}

/// 明るさ・彩度調整の引数
#[derive(Debug, Clone, Default, Args)]
pub struct AdjustArgs {
    /// 入力ディレクトリ
    pub input_dir: Option<PathBuf>,

    /// 出力ディレクトリ
    pub output_dir: Option<PathBuf>,

    /// 明るさ係数（1より大きいと明るく）
    #[arg(long)]
    pub brightness: Option<f32>,

    /// 彩度係数（1より大きいと鮮やかに）
    #[arg(long)]
    pub saturation: Option<f32>,

    /// 対象とする拡張子（カンマ区切り）
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// JPEG の保存品質
    #[arg(long)]
    pub jpeg_quality: Option<u8>,
}

impl AdjustArgs {
    pub fn apply(&self, config: &mut AdjustConfig) {
        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(factor) = self.brightness {
            config.brightness_factor = factor;
        }
        if let Some(factor) = self.saturation {
            config.saturation_factor = factor;
        }
        if let Some(extensions) = &self.extensions {
            config.extensions = extensions.clone();
        }
        if let Some(quality) = self.jpeg_quality {
            config.jpeg_quality = quality;
        }
    }

    pub fn run(&self, app: &AppConfig) -> Result<BatchReport> {
        let mut config = app.adjust.clone();
        self.apply(&mut config);

        println!("=== 明るさ・彩度調整 ===");
        println!("入力: {}", config.input_dir.display());
        println!("出力: {}", config.output_dir.display());
        println!(
            "明るさ係数: {}, 彩度係数: {}",
            config.brightness_factor, config.saturation_factor
        );

        let report = adjust_directory(&config)?;
        print_report(&report);
        Ok(report)
    }
}

/// フレーム抽出の引数
#[derive(Debug, Clone, Default, Args)]
pub struct ExtractArgs {
    /// 動画ディレクトリ
    pub video_dir: Option<PathBuf>,

    /// 出力ディレクトリ
    pub output_dir: Option<PathBuf>,

    /// フレーム抽出間隔（1 = 全フレーム）
    #[arg(short, long)]
    pub interval: Option<u32>,

    /// 横長フレームを縦長に回転しない
    #[arg(long)]
    pub no_reorient: bool,

    /// 対象とする拡張子（カンマ区切り）
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// JPEG の保存品質
    #[arg(long)]
    pub jpeg_quality: Option<u8>,
}

impl ExtractArgs {
    pub fn apply(&self, config: &mut ExtractConfig) {
        if let Some(dir) = &self.video_dir {
            config.video_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(interval) = self.interval {
            config.frame_interval = interval;
        }
        if self.no_reorient {
            config.reorient_landscape = false;
        }
        if let Some(extensions) = &self.extensions {
            config.extensions = extensions.clone();
        }
        if let Some(quality) = self.jpeg_quality {
            config.jpeg_quality = quality;
        }
    }

    pub fn run(&self, app: &AppConfig) -> Result<BatchReport> {
        let mut config = app.extract.clone();
        self.apply(&mut config);

        println!("=== 動画フレーム抽出 ===");
        println!("動画ディレクトリ: {}", config.video_dir.display());
        println!("出力ディレクトリ: {}", config.output_dir.display());
        println!("抽出間隔: {}フレームごと", config.frame_interval);

        let report = extract_directory(&config)?;
        print_report(&report);
        Ok(report)
    }
}

/// アノテーション可視化の引数
#[derive(Debug, Clone, Default, Args)]
pub struct VisualizeArgs {
    /// LabelMe JSON ファイル（省略時はアノテーションディレクトリ内の全 JSON）
    pub json: Option<PathBuf>,

    /// 元画像（省略時は JSON の imagePath から解決）
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// JSON を探すディレクトリ
    #[arg(long)]
    pub annotation_dir: Option<PathBuf>,

    /// 出力ディレクトリ
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// マスク単体の画像も保存する
    #[arg(long)]
    pub save_mask: bool,

    /// 重ね合わせの強さ（0〜1）
    #[arg(long)]
    pub alpha: Option<f32>,
}

impl VisualizeArgs {
    pub fn apply(&self, config: &mut VisualizeConfig) {
        if let Some(dir) = &self.annotation_dir {
            config.annotation_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.save_mask {
            config.save_mask = true;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
    }

    pub fn run(&self, app: &AppConfig) -> Result<BatchReport> {
        let mut config = app.visualize.clone();
        self.apply(&mut config);
        config.validate()?;

        println!("=== アノテーション可視化 ===");

        let Some(json) = &self.json else {
            println!("アノテーションディレクトリ: {}", config.annotation_dir.display());
            let report = visualize_directory(&config)?;
            print_report(&report);
            return Ok(report);
        };

        if !json.is_file() {
            eprintln!("エラー: JSON ファイル {} が存在しません", json.display());
            print_candidates(&config.annotation_dir);
            anyhow::bail!("JSON ファイルが見つかりません: {}", json.display());
        }

        let summary = visualize_annotation(json, self.image.as_deref(), &config)?;
        println!("JSON: {}", summary.json_path.display());
        println!("画像サイズ: {}x{}", summary.width, summary.height);
        println!("有効なシェイプ: {}", summary.contributing_shapes);
        println!("スキップしたシェイプ: {}", summary.skipped_shapes);
        println!("マスクの最大値: {}", summary.max_mask_value);
        println!("出力: {}", summary.overlay_path.display());
        if let Some(mask_path) = &summary.mask_path {
            println!("マスク: {}", mask_path.display());
        }

        Ok(BatchReport {
            outcomes: vec![FileOutcome {
                path: summary.json_path,
                status: FileStatus::Processed,
            }],
        })
    }
}

/// 指定の JSON が無い場合に候補を一覧表示
fn print_candidates(annotation_dir: &Path) {
    match list_json_files(annotation_dir) {
        Ok(files) if !files.is_empty() => {
            println!(
                "{} に {} 個の JSON ファイルがあります:",
                annotation_dir.display(),
                files.len()
            );
            for (i, f) in files.iter().enumerate() {
                let name = f.file_name().map(|s| s.to_string_lossy()).unwrap_or_default();
                println!("  {}. {}", i + 1, name);
            }
            println!("いずれかのファイルを指定してください");
        }
        Ok(_) => println!("{} に JSON ファイルがありません", annotation_dir.display()),
        Err(e) => println!("{}", e),
    }
}

/// 最終サマリーを表示
pub fn print_report(report: &BatchReport) {
    println!();
    println!("=== 処理完了 ===");
    println!("総数: {}", report.total());
    println!("成功: {}", report.processed());
    println!("失敗: {}", report.failed());
    for (path, reason) in report.failures() {
        println!("  ✗ {}: {}", path.display(), reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_args_override_config() {
        let args = ExtractArgs {
            video_dir: Some(PathBuf::from("videos")),
            interval: Some(3),
            no_reorient: true,
            extensions: Some(vec!["mp4".to_string()]),
            ..ExtractArgs::default()
        };
        let mut config = ExtractConfig::default();
        args.apply(&mut config);

        assert_eq!(config.video_dir, PathBuf::from("videos"));
        assert_eq!(config.output_dir, ExtractConfig::default().output_dir);
        assert_eq!(config.frame_interval, 3);
        assert!(!config.reorient_landscape);
        assert_eq!(config.extensions, vec!["mp4".to_string()]);
    }

    #[test]
    fn test_adjust_args_keep_unset_values() {
        let args = AdjustArgs {
            saturation: Some(1.2),
            ..AdjustArgs::default()
        };
        let mut config = AdjustConfig::default();
        args.apply(&mut config);

        assert_eq!(config.saturation_factor, 1.2);
        assert_eq!(config.brightness_factor, 1.0);
        assert_eq!(config.input_dir, AdjustConfig::default().input_dir);
    }

    #[test]
    fn test_rotate_missing_directory_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let args = RotateArgs {
            image_dir: Some(dir.path().join("missing")),
            ..RotateArgs::default()
        };
        let err = args.run(&AppConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::PrepError>(),
            Some(crate::error::PrepError::DirectoryNotFound(_))
        ));
    }
}
