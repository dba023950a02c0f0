//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `EditorConfig`，保证运行时行为可观测、可调整、可测试。
//! 压缩预算、画笔范围、遮罩二值化阈值等都属于产品契约的一部分，
//! 集中声明可避免魔法数字散落在各个阶段。
//!
//! ## 实现思路
//!
//! - `Default` 提供与产品契约一致的生产配置。
//! - `validate` 在入口层统一拦截非法组合（下限不得高于初始值等）。

use image::imageops::FilterType;

use super::EditError;

/// 压缩目标预算（字节）。超过该体积的输入会被降质重编码。
pub const COMPRESS_BYTE_BUDGET: u64 = 4_000_000;

/// 遮罩二值化阈值：红色通道大于该值视为“编辑区”。
pub const MASK_BINARIZE_THRESHOLD: u8 = 128;

/// 编辑流水线配置。
///
/// 字段覆盖了加载、压缩、绘制与预览渲染四个阶段。
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_input_bytes: u64,
    /// 压缩目标预算（字节）。
    pub byte_budget: u64,
    /// 超过该体积视为“严重超标”，采用更激进的初始参数。
    pub aggressive_input_bytes: u64,
    /// 常规初始 JPEG 质量（0.0–1.0）。
    pub initial_quality: f32,
    /// 严重超标时的初始 JPEG 质量。
    pub aggressive_initial_quality: f32,
    /// 常规初始长边上限（像素）。
    pub initial_max_dimension: u32,
    /// 严重超标时的初始长边上限（像素）。
    pub aggressive_initial_max_dimension: u32,
    /// 每轮质量递减步长。
    pub quality_step: f32,
    /// 质量下限，到达后不再继续降质。
    pub quality_floor: f32,
    /// 每轮长边递减步长（像素）。
    pub dimension_step: u32,
    /// 长边下限（像素），到达后不再继续缩小。
    pub dimension_floor: u32,
    /// 降采样滤镜策略。
    pub resize_filter: FilterType,
    /// 画笔半径下限（像素），对应直径 20 的控件下限。
    pub brush_min_radius: u32,
    /// 画笔半径上限（像素），对应直径 500 的控件上限。
    pub brush_max_radius: u32,
    /// 默认画笔半径（像素）。
    pub default_brush_radius: u32,
    /// 预览着色：红色通道增量。
    pub overlay_red_boost: u8,
    /// 预览着色：绿色通道减量。
    pub overlay_green_cut: u8,
    /// 预览着色：蓝色通道减量。
    pub overlay_blue_cut: u8,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 50 * 1024 * 1024,
            byte_budget: COMPRESS_BYTE_BUDGET,
            aggressive_input_bytes: 2 * COMPRESS_BYTE_BUDGET,
            initial_quality: 0.7,
            aggressive_initial_quality: 0.3,
            initial_max_dimension: 1200,
            aggressive_initial_max_dimension: 800,
            quality_step: 0.2,
            quality_floor: 0.1,
            dimension_step: 200,
            dimension_floor: 400,
            resize_filter: FilterType::Triangle,
            brush_min_radius: 10,
            brush_max_radius: 250,
            default_brush_radius: 20,
            overlay_red_boost: 100,
            overlay_green_cut: 50,
            overlay_blue_cut: 50,
        }
    }
}

impl EditorConfig {
    /// 校验配置组合是否自洽。
    ///
    /// 自定义配置（如 CLI 覆盖画笔范围）必须先通过此校验再进入流水线。
    pub fn validate(&self) -> Result<(), EditError> {
        if self.byte_budget == 0 {
            return Err(EditError::InvalidFormat("byte_budget 不能为 0".to_string()));
        }
        if self.byte_budget > self.max_input_bytes {
            return Err(EditError::InvalidFormat(
                "byte_budget 不能大于 max_input_bytes".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.quality_floor)
            || !(0.0..=1.0).contains(&self.initial_quality)
            || !(0.0..=1.0).contains(&self.aggressive_initial_quality)
        {
            return Err(EditError::InvalidFormat(
                "JPEG 质量参数必须在 0.0~1.0 之间".to_string(),
            ));
        }
        if self.quality_floor > self.aggressive_initial_quality
            || self.aggressive_initial_quality > self.initial_quality
        {
            return Err(EditError::InvalidFormat(
                "质量参数必须满足 floor <= aggressive <= initial".to_string(),
            ));
        }
        if self.dimension_floor == 0
            || self.dimension_floor > self.aggressive_initial_max_dimension
            || self.aggressive_initial_max_dimension > self.initial_max_dimension
        {
            return Err(EditError::InvalidFormat(
                "尺寸参数必须满足 floor <= aggressive <= initial 且大于 0".to_string(),
            ));
        }
        if self.quality_step <= 0.0 || self.dimension_step == 0 {
            return Err(EditError::InvalidFormat(
                "质量与尺寸步长必须大于 0".to_string(),
            ));
        }
        if self.brush_min_radius == 0 || self.brush_min_radius > self.brush_max_radius {
            return Err(EditError::InvalidFormat(
                "画笔半径范围必须满足 0 < min <= max".to_string(),
            ));
        }
        if !(self.brush_min_radius..=self.brush_max_radius).contains(&self.default_brush_radius) {
            return Err(EditError::InvalidFormat(
                "默认画笔半径必须落在 min~max 范围内".to_string(),
            ));
        }
        Ok(())
    }
}
