//! # 预览渲染模块
//!
//! ## 设计思路
//!
//! 预览是“源图 + 遮罩”的纯派生视图：每次笔画后整幅重算，
//! 不做增量 diff——画布尺寸已被压缩阶段限制，整幅重算的成本有界，
//! 换来的是源图像素永远保持原样（非破坏式）。

use image::{Rgba, RgbaImage};

use super::EditorConfig;
use super::config::MASK_BINARIZE_THRESHOLD;

/// 渲染着色预览。
///
/// 遮罩红色通道超过二值化阈值的像素被着色（红增、绿蓝减，均饱和截断），
/// 其余像素原样复制。两个光栅的尺寸必须一致，由会话不变量保证。
pub fn render_overlay(source: &RgbaImage, mask: &RgbaImage, config: &EditorConfig) -> RgbaImage {
    debug_assert_eq!(source.dimensions(), mask.dimensions());

    let mut view = source.clone();
    for (out, mask_px) in view.pixels_mut().zip(mask.pixels()) {
        if mask_px.0[0] > MASK_BINARIZE_THRESHOLD {
            let [r, g, b, a] = out.0;
            *out = Rgba([
                r.saturating_add(config.overlay_red_boost),
                g.saturating_sub(config.overlay_green_cut),
                b.saturating_sub(config.overlay_blue_cut),
                a,
            ]);
        }
    }
    view
}
