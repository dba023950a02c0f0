//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 入口层（CLI）统一返回 `Result<T, AppError>`，各子系统错误通过
//! `From` 上转，无需手动 map。

use crate::editor::EditError;
use crate::gateway::GatewayError;

/// 应用级统一错误类型
///
/// CLI 入口均返回此类型，确保出口处收到一致的错误格式。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 编辑流水线错误（加载 / 压缩 / 绘制 / 导出）
    #[error("{0}")]
    Edit(#[from] EditError),

    /// 网关错误（校验 / 上游调用 / 结果下载）
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 命令行参数错误
    #[error("参数错误: {0}")]
    Usage(String),
}
