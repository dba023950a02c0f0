//! # 压缩流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 预算内字节”的过程集中管理：低于预算的输入逐字节透传，
//! 超出预算的输入按质量/尺寸阶梯降级重编码，直到满足预算或到达下限。
//! 到达下限仍超预算时返回尽力结果而不是报错——压缩永远不阻断流程。
//!
//! ## 实现思路
//!
//! 1. 体积判断，预算内直接透传
//! 2. 完整解码，按输入体积选择初始质量与长边上限
//! 3. 有界循环：降采样 → JPEG 重编码 → 预算判断 → 双参数降档
//! 4. 对最终编码结果重新解码，保证像素与提交字节一致

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use std::io::Cursor;
use std::time::Instant;

use super::loader;
use super::source::PreparedSource;
use super::{EditError, EditorConfig};

/// 质量下限比较的浮点容差。
const QUALITY_EPSILON: f32 = 1e-3;

/// 将输入字节压缩到预算内。
///
/// 返回的 `PreparedSource` 同时携带编码字节与解码像素，
/// 后续绘制与预览都建立在这份（可能已降质的）图像上。
///
/// # 示例
/// ```rust,ignore
/// use inpaint_studio::editor::{compressor, EditorConfig};
///
/// let prepared = compressor::compress_to_budget(&bytes, &EditorConfig::default())?;
/// assert!(prepared.bytes.len() as u64 <= 4_000_000 || prepared.passes > 0);
/// # Ok::<(), inpaint_studio::editor::EditError>(())
/// ```
pub fn compress_to_budget(raw: &[u8], config: &EditorConfig) -> Result<PreparedSource, EditError> {
    if raw.is_empty() {
        return Err(EditError::Decode("图片内容为空，无法压缩".to_string()));
    }

    let total_start = Instant::now();

    if raw.len() as u64 <= config.byte_budget {
        let pixels = loader::decode_rgba(raw)?;
        let mime = loader::sniff_mime(raw).unwrap_or("image/png");
        log::info!(
            "✅ 图片体积在预算内，直接透传 - {} KB（预算 {} KB）",
            raw.len() / 1024,
            config.byte_budget / 1024
        );
        return Ok(PreparedSource {
            bytes: raw.to_vec(),
            mime,
            pixels,
            passes: 0,
        });
    }

    let decoded = image::load_from_memory(raw)
        .map_err(|e| EditError::Decode(format!("图片解码失败：{}", e)))?;
    let (source_width, source_height) = decoded.dimensions();

    // 严重超标的输入直接从更低的档位起步，减少无效编码轮次。
    let far_oversized = raw.len() as u64 > config.aggressive_input_bytes;
    let mut quality = if far_oversized {
        config.aggressive_initial_quality
    } else {
        config.initial_quality
    };
    let mut max_dimension = if far_oversized {
        config.aggressive_initial_max_dimension
    } else {
        config.initial_max_dimension
    };

    log::info!(
        "🗜️ 图片超出预算，开始压缩 - 输入 {} KB 预算 {} KB 原始尺寸 {}x{} 初始质量 {:.2} 初始长边 {}",
        raw.len() / 1024,
        config.byte_budget / 1024,
        source_width,
        source_height,
        quality,
        max_dimension
    );

    let mut passes: u32 = 0;
    let encoded = loop {
        passes += 1;

        let scaled = downscale_to_max_dimension(&decoded, max_dimension, config)?;
        let encoded = encode_jpeg(&scaled, quality)?;

        log::debug!(
            "🔁 第 {} 轮压缩：质量 {:.2} 长边 {} -> 输出 {} KB",
            passes,
            quality,
            max_dimension,
            encoded.len() / 1024
        );

        if encoded.len() as u64 <= config.byte_budget {
            break encoded;
        }

        let quality_at_floor = quality <= config.quality_floor + QUALITY_EPSILON;
        let dimension_at_floor = max_dimension <= config.dimension_floor;
        if quality_at_floor || dimension_at_floor {
            log::warn!(
                "⚠️ 已到质量与尺寸下限仍超出预算，返回尽力结果 - {} KB（预算 {} KB）",
                encoded.len() / 1024,
                config.byte_budget / 1024
            );
            break encoded;
        }

        quality = (quality - config.quality_step).max(config.quality_floor);
        max_dimension = max_dimension
            .saturating_sub(config.dimension_step)
            .max(config.dimension_floor);
    };

    // 用最终编码结果重建像素，保证预览/遮罩与提交内容完全一致。
    let pixels = loader::decode_rgba(&encoded)?;

    log::info!(
        "✅ 压缩完成 - 输入 {} KB 输出 {} KB 输出尺寸 {}x{} 轮次 {} 耗时 {}ms",
        raw.len() / 1024,
        encoded.len() / 1024,
        pixels.width(),
        pixels.height(),
        passes,
        total_start.elapsed().as_millis()
    );

    Ok(PreparedSource {
        bytes: encoded,
        mime: "image/jpeg",
        pixels,
        passes,
    })
}

/// 等比缩放，使长边不超过 `max_dimension`；不放大。
fn downscale_to_max_dimension(
    image: &DynamicImage,
    max_dimension: u32,
    config: &EditorConfig,
) -> Result<DynamicImage, EditError> {
    let (width, height) = image.dimensions();
    let longer = width.max(height);

    if longer <= max_dimension {
        return Ok(image.clone());
    }

    let scale = max_dimension as f64 / longer as f64;
    let target_width = ((width as f64 * scale).round() as u32).max(1);
    let target_height = ((height as f64 * scale).round() as u32).max(1);

    match resize_with_fast_image_resize(image, target_width, target_height, config.resize_filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!(
                "⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}",
                err
            );
            Ok(image.resize_exact(target_width, target_height, config.resize_filter))
        }
    }
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: image::imageops::FilterType,
) -> Result<DynamicImage, EditError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| EditError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| EditError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
        target_width,
        target_height,
        dst_image.into_vec(),
    )
    .ok_or_else(|| EditError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}

fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
    match filter {
        image::imageops::FilterType::Nearest => fr::FilterType::Box,
        image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
        image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
        image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
        image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

/// JPEG 有损编码。透明通道在此处丢弃（JPEG 无 alpha）。
fn encode_jpeg(image: &DynamicImage, quality: f32) -> Result<Vec<u8>, EditError> {
    let quality_u8 = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let rgb = image.to_rgb8();

    let mut cursor = Cursor::new(Vec::new());
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality_u8);
    encoder
        .encode_image(&rgb)
        .map_err(|e| EditError::Encode(format!("JPEG 编码失败：{}", e)))?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    /// 生成噪声图片，保证 JPEG 压缩不会“轻松见底”。
    fn create_noise_png(width: u32, height: u32) -> Vec<u8> {
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        let img = ImageBuffer::from_fn(width, height, |_, _| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let r = (seed >> 33) as u8;
            let g = (seed >> 41) as u8;
            let b = (seed >> 49) as u8;
            Rgba([r, g, b, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode noise image");
        cursor.into_inner()
    }

    #[test]
    fn passes_through_under_budget_input_unchanged() {
        let png = create_noise_png(64, 64);
        let prepared = compress_to_budget(&png, &EditorConfig::default())
            .expect("small image should pass through");

        assert_eq!(prepared.bytes, png);
        assert_eq!(prepared.passes, 0);
        assert_eq!(prepared.mime, "image/png");
    }

    #[test]
    fn compresses_over_budget_input_below_budget() {
        let png = create_noise_png(900, 900);
        let mut config = EditorConfig::default();
        config.byte_budget = 96 * 1024;
        config.aggressive_input_bytes = 2 * config.byte_budget;

        assert!(png.len() as u64 > config.byte_budget);

        let prepared =
            compress_to_budget(&png, &config).expect("compression should not fail on oversize");

        assert!(prepared.bytes.len() as u64 <= config.byte_budget);
        assert!(prepared.bytes.len() <= png.len());
        assert!(prepared.passes >= 1);
        assert_eq!(prepared.mime, "image/jpeg");
    }

    #[test]
    fn terminates_at_floors_and_returns_best_effort() {
        let png = create_noise_png(600, 600);
        let mut config = EditorConfig::default();
        // 预算小到任何档位都无法满足，循环必须在下限处停止。
        config.byte_budget = 64;
        config.aggressive_input_bytes = 128;

        let prepared =
            compress_to_budget(&png, &config).expect("floor exhaustion must not error");

        assert!(prepared.bytes.len() as u64 > config.byte_budget);
        assert!(prepared.passes >= 1);
        // 质量阶梯 0.3 -> 0.1 共 2 档，尺寸阶梯 800 -> 400 共 3 档，
        // 轮次必然有限。
        assert!(prepared.passes <= 4);
    }

    #[test]
    fn downscale_keeps_aspect_ratio() {
        let png = create_noise_png(800, 400);
        let decoded = image::load_from_memory(&png).expect("decode noise png");

        let scaled = downscale_to_max_dimension(&decoded, 400, &EditorConfig::default())
            .expect("downscale should succeed");

        assert_eq!(scaled.dimensions(), (400, 200));
    }

    #[test]
    fn downscale_never_upscales() {
        let png = create_noise_png(200, 100);
        let decoded = image::load_from_memory(&png).expect("decode noise png");

        let scaled = downscale_to_max_dimension(&decoded, 800, &EditorConfig::default())
            .expect("downscale should succeed");

        assert_eq!(scaled.dimensions(), (200, 100));
    }

    #[test]
    fn rejects_empty_input() {
        let result = compress_to_budget(&[], &EditorConfig::default());
        assert!(matches!(result, Err(EditError::Decode(_))));
    }

    #[test]
    fn rejects_undecodable_input() {
        let mut config = EditorConfig::default();
        config.byte_budget = 4;
        let result = compress_to_budget(&[0x55; 128], &config);
        assert!(matches!(result, Err(EditError::Decode(_))));
    }
}
