use image::{GenericImage, GrayImage, ImageResult, Rgb, RgbImage};

/// 重ね合わせの見た目
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub tint: Rgb<u8>,
    pub alpha: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            tint: Rgb([255, 0, 0]),
            alpha: 0.5,
        }
    }
}

/// マスクが立っている画素に色を加算合成する
///
/// `out = saturate(src + alpha * tint)`。マスク外は元画像のまま。
pub fn tint_overlay(image: &RgbImage, mask: &GrayImage, style: &OverlayStyle) -> RgbImage {
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let covered = mask
            .get_pixel_checked(x, y)
            .map(|m| m.0[0] > 0)
            .unwrap_or(false);
        if !covered {
            continue;
        }
        for (channel, tint) in pixel.0.iter_mut().zip(style.tint.0) {
            let blended = f32::from(*channel) + style.alpha * f32::from(tint);
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// グレースケールのマスクを RGB に展開
pub fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

/// 元画像 / マスク / 重ね合わせ の3枚を横に並べる
pub fn render_panels(
    image: &RgbImage,
    mask: &GrayImage,
    style: &OverlayStyle,
) -> ImageResult<RgbImage> {
    let (width, height) = image.dimensions();
    let overlay = tint_overlay(image, mask, style);

    let mut canvas = RgbImage::new(width * 3, height);
    canvas.copy_from(image, 0, 0)?;
    canvas.copy_from(&mask_to_rgb(mask), width, 0)?;
    canvas.copy_from(&overlay, width * 2, 0)?;
    Ok(canvas)
}
