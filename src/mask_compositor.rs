//! アノテーションのシェイプから2値マスクを合成する
//!
//! マスクバッファは元画像と同じサイズの 8bit 単チャンネル画像で、
//! 各シェイプの領域を画素ごとの最大値で足し込む（上書きしない）。
//! そのためシェイプの順序によらず同じ結果になる。

use crate::annotation::{decode_embedded_image, GeometryError, PixelPoint, Shape, ShapeGeometry};
use image::{imageops, GrayImage, Luma};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

pub const MASK_ON: u8 = 255;

/// シェイプを処理しなかった理由
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// 対応していない shape_type
    Unsupported(String),
    Geometry(GeometryError),
    /// 埋め込みマスクのデコード失敗
    MaskDecode(String),
    /// 配置先が画像の外
    EmptyPlacement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedShape {
    /// shapes 配列内の位置
    pub index: usize,
    pub label: String,
    pub reason: SkipReason,
}

/// 合成結果
#[derive(Debug, Clone)]
pub struct MaskComposition {
    pub mask: GrayImage,
    /// マスクに寄与したシェイプ数
    pub contributing: usize,
    pub skipped: Vec<SkippedShape>,
}

impl MaskComposition {
    pub fn has_mask(&self) -> bool {
        self.contributing > 0
    }

    pub fn max_value(&self) -> u8 {
        self.mask.pixels().map(|p| p.0[0]).max().unwrap_or(0)
    }

    /// 0 より大きい画素数
    pub fn covered_pixels(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] > 0).count()
    }
}

/// マスクバッファへの足し込み
pub struct MaskCompositor {
    mask: GrayImage,
    contributing: usize,
    skipped: Vec<SkippedShape>,
}

impl MaskCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mask: GrayImage::new(width, height),
            contributing: 0,
            skipped: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.mask.width() == 0 || self.mask.height() == 0
    }

    fn skip(&mut self, index: usize, shape: &Shape, reason: SkipReason) {
        match &reason {
            SkipReason::Unsupported(shape_type) => {
                debug!("未対応の shape_type をスキップ: '{}' (ラベル: {})", shape_type, shape.label)
            }
            SkipReason::Geometry(e) => warn!("警告: {} (ラベル: {})", e, shape.label),
            SkipReason::MaskDecode(e) => {
                warn!("mask データのデコードに失敗しました: {} (ラベル: {})", e, shape.label)
            }
            SkipReason::EmptyPlacement => {
                warn!("mask の配置先が画像の範囲外です (ラベル: {})", shape.label)
            }
        }
        self.skipped.push(SkippedShape {
            index,
            label: shape.label.clone(),
            reason,
        });
    }

    /// シェイプ1つを足し込む
    pub fn add_shape(&mut self, index: usize, shape: &Shape) {
        let geometry = match shape.geometry() {
            Ok(geometry) => geometry,
            Err(e) => {
                self.skip(index, shape, SkipReason::Geometry(e));
                return;
            }
        };

        match geometry {
            ShapeGeometry::Polygon(vertices) => {
                self.fill_polygon(&vertices);
                self.contributing += 1;
            }
            ShapeGeometry::Rectangle(a, b) => {
                self.fill_rectangle(a, b);
                self.contributing += 1;
            }
            ShapeGeometry::Mask {
                top_left,
                bottom_right,
                encoded,
            } => match self.paste_mask(top_left, bottom_right, encoded) {
                Ok(()) => self.contributing += 1,
                Err(reason) => self.skip(index, shape, reason),
            },
            ShapeGeometry::Unknown(shape_type) => {
                self.skip(index, shape, SkipReason::Unsupported(shape_type))
            }
        }
    }

    /// 多角形の内部と境界を塗りつぶす
    fn fill_polygon(&mut self, vertices: &[PixelPoint]) {
        if self.is_empty() {
            return;
        }
        let points: Vec<Point<i32>> = vertices.iter().map(|p| Point::new(p.x, p.y)).collect();
        draw_polygon_mut(&mut self.mask, &points, Luma([MASK_ON]));
    }

    /// 2点を対角とする矩形（両端を含む）を塗りつぶす
    fn fill_rectangle(&mut self, a: PixelPoint, b: PixelPoint) {
        if self.is_empty() {
            return;
        }
        let max_x = self.mask.width() as i32 - 1;
        let max_y = self.mask.height() as i32 - 1;

        let x0 = a.x.min(b.x).max(0);
        let y0 = a.y.min(b.y).max(0);
        let x1 = a.x.max(b.x).min(max_x);
        let y1 = a.y.max(b.y).min(max_y);
        if x0 > x1 || y0 > y1 {
            return;
        }

        let rect = Rect::at(x0, y0).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
        draw_filled_rect_mut(&mut self.mask, rect, Luma([MASK_ON]));
    }

    /// 埋め込みマスクをデコードし、配置先の矩形に合わせて足し込む
    ///
    /// 配置先は画像の範囲に切り詰め、切り詰めた矩形にリサイズする。
    fn paste_mask(
        &mut self,
        top_left: PixelPoint,
        bottom_right: PixelPoint,
        encoded: &str,
    ) -> Result<(), SkipReason> {
        let decoded = decode_embedded_image(encoded)
            .map_err(|e| SkipReason::MaskDecode(e.to_string()))?;

        // 単チャンネル化して 0/255 に2値化
        let mut patch = decoded.to_luma8();
        for pixel in patch.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > 0 { MASK_ON } else { 0 };
        }

        let x1 = top_left.x.max(0);
        let y1 = top_left.y.max(0);
        let x2 = bottom_right.x.min(self.mask.width() as i32);
        let y2 = bottom_right.y.min(self.mask.height() as i32);
        if x2 <= x1 || y2 <= y1 {
            return Err(SkipReason::EmptyPlacement);
        }

        let target_w = (x2 - x1) as u32;
        let target_h = (y2 - y1) as u32;
        let resized = if patch.dimensions() == (target_w, target_h) {
            patch
        } else {
            imageops::resize(&patch, target_w, target_h, imageops::FilterType::Nearest)
        };

        for (dx, dy, value) in resized.enumerate_pixels() {
            let target = self.mask.get_pixel_mut(x1 as u32 + dx, y1 as u32 + dy);
            target.0[0] = target.0[0].max(value.0[0]);
        }

        Ok(())
    }

    pub fn finish(self) -> MaskComposition {
        MaskComposition {
            mask: self.mask,
            contributing: self.contributing,
            skipped: self.skipped,
        }
    }
}

/// 全シェイプを文書順に合成する
pub fn compose_mask(shapes: &[Shape], width: u32, height: u32) -> MaskComposition {
    if !shapes.is_empty() {
        info!("{}個のアノテーションシェイプを処理します...", shapes.len());
    }

    let mut compositor = MaskCompositor::new(width, height);
    for (index, shape) in shapes.iter().enumerate() {
        compositor.add_shape(index, shape);
    }
    let composition = compositor.finish();

    if composition.has_mask() {
        info!(
            "マスクを生成しました（最大値: {}）",
            composition.max_value()
        );
    } else {
        warn!("警告: マスクを生成できませんでした (no mask generated)。有効なアノテーションがありません");
    }

    composition
}
