//! アプリケーション設定
//!
//! 各ユーティリティの入出力ディレクトリや係数は `dataset_prep.toml` に保存する。
//! ファイルが無い場合はデフォルト値を使い、コマンドライン引数で上書きできる。

use crate::error::{PrepError, PrepResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_CONFIG_NAME: &str = "dataset_prep.toml";
const CONFIG_ENV_VAR: &str = "DATASET_PREP_CONFIG";

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

fn to_strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// 画像回転の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateConfig {
    /// 対象ディレクトリ（上書き保存）
    pub image_dir: PathBuf,
    /// 対象とする拡張子
    pub extensions: Vec<String>,
    pub jpeg_quality: u8,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("data/frames"),
            extensions: to_strings(&["jpg", "jpeg", "png", "bmp", "gif"]),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// 明るさ・彩度調整の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
    /// 明るさ係数（V チャンネル）。1より大きいと明るくなる
    pub brightness_factor: f32,
    /// 彩度係数（S チャンネル）。1より大きいと鮮やかになる
    pub saturation_factor: f32,
    pub jpeg_quality: u8,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/frames"),
            output_dir: PathBuf::from("data/enhanced"),
            extensions: to_strings(&["jpg", "jpeg", "png"]),
            brightness_factor: 1.0,
            saturation_factor: 1.4,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// フレーム抽出の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub video_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
    /// フレーム抽出間隔（フレーム数）。1なら全フレーム
    pub frame_interval: u32,
    /// 横長フレームを反時計回りに90度回転して縦長にする
    pub reorient_landscape: bool,
    pub jpeg_quality: u8,
    /// 何フレーム保存するごとに進捗を出すか
    pub progress_every: u32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("data/videos"),
            output_dir: PathBuf::from("data/frames"),
            extensions: to_strings(&["mp4", "avi", "mov", "mkv", "wmv", "flv"]),
            frame_interval: 1,
            reorient_landscape: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress_every: 100,
        }
    }
}

/// アノテーション可視化の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizeConfig {
    /// LabelMe JSON を探すディレクトリ
    pub annotation_dir: PathBuf,
    pub output_dir: PathBuf,
    /// マスク単体の画像も保存する
    pub save_mask: bool,
    /// 重ね合わせの色（RGB）
    pub tint: [u8; 3],
    /// 重ね合わせの強さ
    pub alpha: f32,
}

impl Default for VisualizeConfig {
    fn default() -> Self {
        Self {
            annotation_dir: PathBuf::from("data/mask_json"),
            output_dir: PathBuf::from("data/overlays"),
            save_mask: false,
            tint: [255, 0, 0],
            alpha: 0.5,
        }
    }
}

/// 全ユーティリティの設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rotate: RotateConfig,
    pub adjust: AdjustConfig,
    pub extract: ExtractConfig,
    pub visualize: VisualizeConfig,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス（環境変数で上書き可能）
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME))
    }

    /// 設定ファイルを読み込む
    pub fn load(path: &Path) -> PrepResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| PrepError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| PrepError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// デフォルトパスから読み込み、無ければデフォルト設定を返す
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{} - デフォルト設定を使用します", e);
                Self::default()
            }
        }
    }

    /// 指定パスがあればそれを、無ければデフォルトパスを読む
    pub fn load_from(path: Option<&Path>) -> PrepResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::load_or_default()),
        }
    }

    /// 設定ファイルを保存
    pub fn save(&self, path: &Path) -> PrepResult<()> {
        let raw = toml::to_string_pretty(self).map_err(|e| PrepError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// 値の範囲を確認
    pub fn validate(&self) -> PrepResult<()> {
        self.rotate.validate()?;
        self.adjust.validate()?;
        self.extract.validate()?;
        self.visualize.validate()
    }

    /// 設定内容を表示
    pub fn display(&self) {
        println!("=== 設定 ===");
        println!("[rotate]");
        println!("  対象ディレクトリ: {}", self.rotate.image_dir.display());
        println!("  拡張子: {}", self.rotate.extensions.join(", "));
        println!("[adjust]");
        println!("  入力: {}", self.adjust.input_dir.display());
        println!("  出力: {}", self.adjust.output_dir.display());
        println!("  明るさ係数: {}", self.adjust.brightness_factor);
        println!("  彩度係数: {}", self.adjust.saturation_factor);
        println!("[extract]");
        println!("  動画ディレクトリ: {}", self.extract.video_dir.display());
        println!("  出力: {}", self.extract.output_dir.display());
        println!("  抽出間隔: {}フレームごと", self.extract.frame_interval);
        println!("  横長フレームの回転: {}", self.extract.reorient_landscape);
        println!("[visualize]");
        println!("  アノテーション: {}", self.visualize.annotation_dir.display());
        println!("  出力: {}", self.visualize.output_dir.display());
        println!();
    }
}

fn check_quality(quality: u8) -> PrepResult<()> {
    if !(1..=100).contains(&quality) {
        return Err(PrepError::InvalidConfig(format!(
            "jpeg_quality は 1〜100 で指定してください: {}",
            quality
        )));
    }
    Ok(())
}

fn check_factor(name: &str, value: f32) -> PrepResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(PrepError::InvalidConfig(format!(
            "{} は 0 以上の有限値で指定してください: {}",
            name, value
        )));
    }
    Ok(())
}

impl RotateConfig {
    pub fn validate(&self) -> PrepResult<()> {
        check_quality(self.jpeg_quality)
    }
}

impl AdjustConfig {
    pub fn validate(&self) -> PrepResult<()> {
        check_factor("brightness_factor", self.brightness_factor)?;
        check_factor("saturation_factor", self.saturation_factor)?;
        check_quality(self.jpeg_quality)
    }
}

impl ExtractConfig {
    pub fn validate(&self) -> PrepResult<()> {
        if self.frame_interval == 0 {
            return Err(PrepError::InvalidConfig(
                "frame_interval は 1 以上で指定してください".to_string(),
            ));
        }
        check_quality(self.jpeg_quality)
    }
}

impl VisualizeConfig {
    pub fn validate(&self) -> PrepResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(PrepError::InvalidConfig(format!(
                "alpha は 0〜1 で指定してください: {}",
                self.alpha
            )));
        }
        Ok(())
    }
}
