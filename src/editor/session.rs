//! # 编辑会话模块
//!
//! ## 设计思路
//!
//! `EditSession` 独占持有一次编辑的全部可变状态：原始像素（只读缓存）、
//! 遮罩缓冲、画笔参数与视图映射。所有修改都经由 `&mut self` 入口，
//! 以所有权代替散落的可变引用，天然排除并发写入。
//!
//! ## 实现思路
//!
//! - 遮罩与源图同生共灭：构造时按源图尺寸初始化全黑遮罩。
//! - 指针坐标先按“视图尺寸 → 画布尺寸”比例换算，再落到像素网格，
//!   保证显示缩放不影响绘制精度；鼠标与触摸共用同一组入口。
//! - 画笔落点以实心圆写入白色；笔迹只增不减，清除遮罩是唯一的重置手段。

use image::{Rgba, RgbaImage};

use super::source::PreparedSource;
use super::{EditError, EditorConfig, mask, overlay};

/// 遮罩“编辑区”颜色。
const MASK_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// 遮罩“保留区”颜色。
const MASK_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 一次图片编辑的会话状态。
///
/// 会话在加载新图片时整体替换，内部状态不跨会话复用。
pub struct EditSession {
    config: EditorConfig,
    /// 压缩后的源图像素，会话期间只读。
    source: RgbaImage,
    /// 压缩后的编码字节，提交时原样使用。
    source_bytes: Vec<u8>,
    source_mime: &'static str,
    /// 单色遮罩缓冲：每个像素为纯黑或纯白。
    mask: RgbaImage,
    brush_radius: u32,
    drawing: bool,
    view_width: f32,
    view_height: f32,
}

impl EditSession {
    /// 基于压缩结果创建会话，遮罩初始化为全黑（全部保留）。
    pub fn new(prepared: PreparedSource, config: EditorConfig) -> Result<Self, EditError> {
        config.validate()?;

        let (width, height) = (prepared.pixels.width(), prepared.pixels.height());
        if width == 0 || height == 0 {
            return Err(EditError::Session("源图尺寸不能为 0".to_string()));
        }

        let mask = RgbaImage::from_pixel(width, height, MASK_BLACK);
        let brush_radius = config.default_brush_radius;

        log::info!(
            "🎨 编辑会话就绪 - 画布 {}x{} 画笔半径 {}px",
            width,
            height,
            brush_radius
        );

        Ok(Self {
            source: prepared.pixels,
            source_bytes: prepared.bytes,
            source_mime: prepared.mime,
            mask,
            brush_radius,
            drawing: false,
            view_width: width as f32,
            view_height: height as f32,
            config,
        })
    }

    pub fn width(&self) -> u32 {
        self.source.width()
    }

    pub fn height(&self) -> u32 {
        self.source.height()
    }

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    pub fn source_bytes(&self) -> &[u8] {
        &self.source_bytes
    }

    pub fn source_mime(&self) -> &'static str {
        self.source_mime
    }

    pub fn mask(&self) -> &RgbaImage {
        &self.mask
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn brush_radius(&self) -> u32 {
        self.brush_radius
    }

    /// 设置显示元素的渲染尺寸，用于指针坐标换算。
    pub fn set_view_size(&mut self, width: f32, height: f32) -> Result<(), EditError> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(EditError::Session(format!(
                "视图尺寸非法：{}x{}",
                width, height
            )));
        }
        self.view_width = width;
        self.view_height = height;
        Ok(())
    }

    /// 按控件直径设置画笔（控件范围 20~500px），越界值收拢到边界。
    pub fn set_brush_diameter(&mut self, diameter: u32) {
        let radius = (diameter / 2)
            .clamp(self.config.brush_min_radius, self.config.brush_max_radius);
        if radius != diameter / 2 {
            log::debug!("🖌️ 画笔直径 {} 越界，收拢为半径 {}", diameter, radius);
        }
        self.brush_radius = radius;
    }

    /// 开始一段笔画，并在起点落一笔。
    pub fn begin_stroke(&mut self, view_x: f32, view_y: f32) {
        self.drawing = true;
        let (cx, cy) = self.to_canvas(view_x, view_y);
        self.stamp_circle(cx, cy);
    }

    /// 延伸当前笔画；未处于绘制状态时不做任何事。
    pub fn extend_stroke(&mut self, view_x: f32, view_y: f32) {
        if !self.drawing {
            return;
        }
        let (cx, cy) = self.to_canvas(view_x, view_y);
        self.stamp_circle(cx, cy);
    }

    /// 结束当前笔画。
    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    /// 将遮罩重置为全黑：预览随之恢复为未修改的源图。
    pub fn clear_mask(&mut self) {
        for pixel in self.mask.pixels_mut() {
            *pixel = MASK_BLACK;
        }
        self.drawing = false;
        log::info!("🧹 遮罩已清空");
    }

    /// 遮罩中“编辑区”（白色）像素数量。
    pub fn mask_coverage(&self) -> u64 {
        self.mask
            .pixels()
            .filter(|p| p.0[0] > super::config::MASK_BINARIZE_THRESHOLD)
            .count() as u64
    }

    /// 用外部遮罩图替换当前遮罩，尺寸必须与源图一致。
    ///
    /// 写入前按阈值二值化，维持“纯黑或纯白”的缓冲不变量。
    pub fn set_mask_from_image(&mut self, external: &RgbaImage) -> Result<(), EditError> {
        if external.dimensions() != self.source.dimensions() {
            return Err(EditError::Session(format!(
                "遮罩尺寸 {}x{} 与源图 {}x{} 不一致",
                external.width(),
                external.height(),
                self.width(),
                self.height()
            )));
        }

        for (dst, src) in self.mask.pixels_mut().zip(external.pixels()) {
            *dst = if src.0[0] > super::config::MASK_BINARIZE_THRESHOLD {
                MASK_WHITE
            } else {
                MASK_BLACK
            };
        }
        Ok(())
    }

    /// 渲染着色预览（源图 + 遮罩的派生视图）。
    pub fn render_overlay(&self) -> RgbaImage {
        overlay::render_overlay(&self.source, &self.mask, &self.config)
    }

    /// 导出二值 alpha 遮罩光栅。
    pub fn export_alpha_mask(&self) -> RgbaImage {
        mask::export_alpha_mask(&self.mask, super::config::MASK_BINARIZE_THRESHOLD)
    }

    /// 导出 PNG 编码的 alpha 遮罩字节（无损，保护 alpha 通道）。
    pub fn alpha_mask_png(&self) -> Result<Vec<u8>, EditError> {
        mask::encode_mask_png(&self.export_alpha_mask())
    }

    /// 导出 PNG 编码的着色预览。
    pub fn overlay_png(&self) -> Result<Vec<u8>, EditError> {
        let view = self.render_overlay();
        let mut cursor = std::io::Cursor::new(Vec::new());
        view.write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| EditError::Encode(format!("预览 PNG 编码失败：{}", e)))?;
        Ok(cursor.into_inner())
    }

    /// 视图坐标 → 画布像素坐标。
    fn to_canvas(&self, view_x: f32, view_y: f32) -> (f32, f32) {
        let scale_x = self.source.width() as f32 / self.view_width;
        let scale_y = self.source.height() as f32 / self.view_height;
        (view_x * scale_x, view_y * scale_y)
    }

    /// 以画笔半径在 `(cx, cy)` 处写入实心白色圆。
    ///
    /// 越界部分直接裁剪，完全在界外的落点是一次空操作。
    fn stamp_circle(&mut self, cx: f32, cy: f32) {
        let radius = self.brush_radius as f32;
        let radius_sq = radius * radius;
        let width = self.mask.width() as i64;
        let height = self.mask.height() as i64;

        let min_x = ((cx - radius).floor() as i64).max(0);
        let max_x = ((cx + radius).ceil() as i64).min(width - 1);
        let min_y = ((cy - radius).floor() as i64).max(0);
        let max_y = ((cy + radius).ceil() as i64).min(height - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= radius_sq {
                    self.mask.put_pixel(x as u32, y as u32, MASK_WHITE);
                }
            }
        }
    }
}
