//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageInput` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `PreparedSource` 表示压缩后可进入编辑会话的图像

use image::RgbaImage;

/// 图片输入来源。
pub enum ImageInput {
    /// 本地文件路径来源。
    FilePath(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
}

/// 加载阶段输出：原始字节与来源标识。
pub struct RawImageData {
    /// 原始图片字节。
    pub bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub source_hint: &'static str,
}

/// 压缩阶段输出：提交用编码字节与编辑用像素数据。
///
/// `bytes` 与 `pixels` 始终来自同一次编码结果——预览与遮罩
/// 都建立在“实际会被提交的那份图像”之上。
pub struct PreparedSource {
    /// 编码后的图片字节（低于预算时与输入逐字节一致）。
    pub bytes: Vec<u8>,
    /// 编码格式对应的 MIME 类型。
    pub mime: &'static str,
    /// 解码后的 RGBA 像素（与 `bytes` 对应）。
    pub pixels: RgbaImage,
    /// 实际执行的编码轮次（透传输入时为 0）。
    pub passes: u32,
}
