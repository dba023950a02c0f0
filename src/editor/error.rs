//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载编辑链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。

/// 编辑链路统一错误类型。
///
/// 该类型会在入口层被上转为 `AppError`，最终透传给调用方。
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("会话状态错误：{0}")]
    Session(String),
}

impl From<EditError> for String {
    /// 兼容部分仍使用字符串错误的调用点。
    fn from(error: EditError) -> Self {
        error.to_string()
    }
}
