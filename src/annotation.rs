//! LabelMe 形式のアノテーション JSON
//!
//! `imagePath` と `shapes` を読み込み、各シェイプを閉じた列挙型
//! [`ShapeGeometry`] に変換する。

use crate::error::{PrepError, PrepResult};
use base64::Engine;
use image::DynamicImage;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// ラスタライズ前に座標をこの範囲に丸める
pub const COORD_LIMIT: i32 = 1 << 16;

/// アノテーション1件（LabelMe JSON 1ファイル）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    #[serde(default)]
    pub version: Option<String>,
    /// 元画像のパス（JSON からの相対パス、区切り文字は `\` の場合もある）
    #[serde(default)]
    pub image_path: String,
    /// base64 で埋め込まれた元画像
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub image_width: Option<u32>,
    #[serde(default)]
    pub image_height: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shapes: Vec<Shape>,
}

fn default_label() -> String {
    "unknown".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn label_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_label))
}

/// シェイプ1つ（JSON のまま）
///
/// `points` は形を検証せずに保持し、[`Shape::geometry`] で解釈する。
/// 壊れた points を持つシェイプがあってもレコード全体は読み込める。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    #[serde(default = "default_label", deserialize_with = "label_or_unknown")]
    pub label: String,
    #[serde(default)]
    pub shape_type: Option<String>,
    #[serde(default)]
    pub points: Value,
    /// mask タイプの場合の base64 PNG
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 画素座標
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    /// 小数点以下を切り捨てて画素座標にする
    pub fn from_coords([x, y]: [f64; 2]) -> Self {
        let limit = f64::from(COORD_LIMIT);
        let to_pixel = |v: f64| v.trunc().clamp(-limit, limit) as i32;
        Self {
            x: to_pixel(x),
            y: to_pixel(y),
        }
    }
}

/// シェイプの種類ごとの形状
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry<'a> {
    Polygon(Vec<PixelPoint>),
    Rectangle(PixelPoint, PixelPoint),
    Mask {
        top_left: PixelPoint,
        bottom_right: PixelPoint,
        encoded: &'a str,
    },
    /// 対応していない shape_type（処理しない）
    Unknown(String),
}

/// 形状データの不備
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("{shape_type}タイプの points 数が不正です: {found}（期待値 {expected}）")]
    PointCount {
        shape_type: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("polygon の頂点が不足しています: {0}")]
    TooFewVertices(usize),

    #[error("mask タイプに mask データがありません")]
    MissingMaskData,

    #[error("points の形式が不正です: {0}")]
    MalformedPoints(String),
}

/// 埋め込み画像のデコード失敗
#[derive(Debug, thiserror::Error)]
pub enum EmbeddedImageError {
    #[error("base64 のデコードに失敗しました: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("画像のデコードに失敗しました: {0}")]
    Image(#[from] image::ImageError),
}

/// base64 で埋め込まれた画像をデコード（空白・改行は無視）
pub fn decode_embedded_image(encoded: &str) -> Result<DynamicImage, EmbeddedImageError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    Ok(image::load_from_memory(&bytes)?)
}

fn two_points(
    shape_type: &'static str,
    points: &[[f64; 2]],
) -> Result<(PixelPoint, PixelPoint), GeometryError> {
    match points {
        [a, b] => Ok((PixelPoint::from_coords(*a), PixelPoint::from_coords(*b))),
        _ => Err(GeometryError::PointCount {
            shape_type,
            expected: 2,
            found: points.len(),
        }),
    }
}

/// `[[x, y], ...]` 形式の points を読む（null は空扱い）
fn parse_points(points: &Value) -> Result<Vec<[f64; 2]>, GeometryError> {
    let items = match points {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => return Err(GeometryError::MalformedPoints(other.to_string())),
    };

    items
        .iter()
        .map(|item| match item.as_array().map(Vec::as_slice) {
            Some([x, y]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok([x, y]),
                _ => Err(GeometryError::MalformedPoints(item.to_string())),
            },
            _ => Err(GeometryError::MalformedPoints(item.to_string())),
        })
        .collect()
}

/// 連続する重複頂点と、始点と同じ終点を取り除く
fn polygon_vertices(points: &[[f64; 2]]) -> Vec<PixelPoint> {
    let mut vertices: Vec<PixelPoint> = Vec::with_capacity(points.len());
    for p in points.iter().copied().map(PixelPoint::from_coords) {
        if vertices.last() != Some(&p) {
            vertices.push(p);
        }
    }
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

impl Shape {
    /// shape_type 文字列から形状へ変換
    pub fn geometry(&self) -> Result<ShapeGeometry<'_>, GeometryError> {
        let shape_type = self.shape_type.as_deref();
        if !matches!(shape_type, Some("polygon" | "rectangle" | "mask")) {
            return Ok(ShapeGeometry::Unknown(shape_type.unwrap_or_default().to_string()));
        }

        let points = parse_points(&self.points)?;
        match shape_type {
            Some("polygon") => {
                let vertices = polygon_vertices(&points);
                if vertices.len() < 3 {
                    return Err(GeometryError::TooFewVertices(vertices.len()));
                }
                Ok(ShapeGeometry::Polygon(vertices))
            }
            Some("rectangle") => {
                let (a, b) = two_points("rectangle", &points)?;
                Ok(ShapeGeometry::Rectangle(a, b))
            }
            Some("mask") => {
                let encoded = self.mask.as_deref().ok_or(GeometryError::MissingMaskData)?;
                let (top_left, bottom_right) = two_points("mask", &points)?;
                Ok(ShapeGeometry::Mask {
                    top_left,
                    bottom_right,
                    encoded,
                })
            }
            _ => Ok(ShapeGeometry::Unknown(shape_type.unwrap_or_default().to_string())),
        }
    }
}

impl AnnotationRecord {
    /// JSON ファイルを読み込む
    pub fn load(path: &Path) -> PrepResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| PrepError::Annotation {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&raw).map_err(|e| PrepError::Annotation {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// 埋め込み画像（imageData）があればデコード
    pub fn embedded_image(&self) -> Option<Result<DynamicImage, EmbeddedImageError>> {
        self.image_data
            .as_deref()
            .filter(|data| !data.trim().is_empty())
            .map(decode_embedded_image)
    }
}

/// 先頭の `..` と `.` を取り除く
fn strip_leading_parents(path: &Path) -> PathBuf {
    path.components()
        .skip_while(|c| matches!(c, Component::ParentDir | Component::CurDir))
        .collect()
}

/// imagePath の候補パス（優先順）
///
/// 区切り文字を `/` にそろえ、JSON のあるディレクトリからの相対パス、
/// 次に JSON ディレクトリの親から `..` を除いたパスを試す。
pub fn image_path_candidates(json_path: &Path, image_path: &str) -> Vec<PathBuf> {
    let image_path = image_path.trim();
    if image_path.is_empty() {
        return Vec::new();
    }

    let normalized = PathBuf::from(image_path.replace('\\', "/"));
    if normalized.is_absolute() {
        return vec![normalized];
    }

    let json_dir = json_path.parent().unwrap_or_else(|| Path::new(""));
    let mut candidates = vec![json_dir.join(&normalized)];
    if let Some(parent) = json_dir.parent() {
        let fallback = parent.join(strip_leading_parents(&normalized));
        if !candidates.contains(&fallback) {
            candidates.push(fallback);
        }
    }
    candidates
}

/// 存在する最初の候補を返す
pub fn resolve_image_path(json_path: &Path, image_path: &str) -> Option<PathBuf> {
    image_path_candidates(json_path, image_path)
        .into_iter()
        .find(|p| p.is_file())
}

/// ディレクトリ以下の JSON ファイルを再帰的に列挙
pub fn list_json_files(dir: &Path) -> PrepResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(PrepError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(PrepError::NotADirectory(dir.to_path_buf()));
    }

    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("json") {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}
