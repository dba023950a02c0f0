//! # 遮罩导出模块
//!
//! ## 设计思路
//!
//! 外部编辑 API 的契约依赖 alpha 通道：不透明 = 重绘区，全透明 = 保留区。
//! 这里把单色遮罩缓冲按逐像素规则转换为二值 alpha 光栅，并以无损 PNG
//! 编码输出——有损格式会污染 alpha 值，直接破坏契约。

use image::{Rgba, RgbaImage};
use std::io::Cursor;

use super::EditError;

/// 将单色遮罩转换为二值 alpha 遮罩。
///
/// 逐像素规则（契约，不可更改）：红色通道 > 阈值 → `(255,255,255,255)`，
/// 否则 → `(0,0,0,0)`。
pub fn export_alpha_mask(mask: &RgbaImage, threshold: u8) -> RgbaImage {
    let mut alpha = RgbaImage::new(mask.width(), mask.height());
    for (out, mask_px) in alpha.pixels_mut().zip(mask.pixels()) {
        *out = if mask_px.0[0] > threshold {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        };
    }
    alpha
}

/// 将 alpha 遮罩编码为 PNG 字节。
pub fn encode_mask_png(alpha: &RgbaImage) -> Result<Vec<u8>, EditError> {
    let mut cursor = Cursor::new(Vec::new());
    alpha
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| EditError::Encode(format!("遮罩 PNG 编码失败：{}", e)))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::config::MASK_BINARIZE_THRESHOLD;

    #[test]
    fn alpha_follows_red_channel_threshold() {
        let mut mask = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 255]));
        mask.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        mask.put_pixel(1, 0, Rgba([128, 0, 0, 255]));
        mask.put_pixel(2, 0, Rgba([129, 0, 0, 255]));

        let alpha = export_alpha_mask(&mask, MASK_BINARIZE_THRESHOLD);

        assert_eq!(alpha.get_pixel(0, 0).0, [255, 255, 255, 255]);
        // 等于阈值按“保留区”处理。
        assert_eq!(alpha.get_pixel(1, 0).0, [0, 0, 0, 0]);
        assert_eq!(alpha.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn all_black_mask_exports_fully_transparent() {
        let mask = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        let alpha = export_alpha_mask(&mask, MASK_BINARIZE_THRESHOLD);

        assert!(alpha.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn png_roundtrip_preserves_binary_alpha() {
        let mut mask = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        for x in 2..6 {
            for y in 2..6 {
                mask.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }

        let alpha = export_alpha_mask(&mask, MASK_BINARIZE_THRESHOLD);
        let png = encode_mask_png(&alpha).expect("png encoding should succeed");

        let decoded = image::load_from_memory(&png)
            .expect("png should decode")
            .to_rgba8();

        assert_eq!(decoded.dimensions(), (8, 8));
        for (expected, actual) in alpha.pixels().zip(decoded.pixels()) {
            assert_eq!(expected.0, actual.0);
        }
    }
}
