//! # 网关错误模型
//!
//! ## 设计思路
//!
//! 网关错误同时承担两个角色：内部可匹配的错误分类，以及对外响应的
//! 状态码 + 提示文案。错误文案是对外契约的一部分，使用英文并给出
//! 可执行的补救建议；分类与状态码的映射集中在 `status_code` 一处。
//!
//! 所有错误对单次请求都是终态：网关内部不做任何自动重试。

/// 编辑网关统一错误类型。
///
/// `Display` 输出即为响应体中的 `error` 字段文案。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 请求校验失败（字段缺失、类型不符、提示词为空）。
    #[error("{0}")]
    Validation(String),

    /// 文件超过 4MB 硬上限。
    #[error("{0}")]
    PayloadTooLarge(String),

    /// 上游拒绝了请求内容（HTTP 400）。
    #[error("{0}")]
    UpstreamRequest(String),

    /// 上游鉴权失败（HTTP 401/403），属于配置问题。
    #[error("{0}")]
    UpstreamAuth(String),

    /// 上游限流（HTTP 429），提示稍后手动重试。
    #[error("{0}")]
    UpstreamRateLimit(String),

    /// 上游服务错误（HTTP 5xx 及其他未归类状态）。
    #[error("{0}")]
    UpstreamServer(String),

    /// 传输层失败（连接重置/超时），按“文件可能过大”提示。
    #[error("{0}")]
    Transport(String),

    /// 其余未归类异常，透传原始信息。
    #[error("{0}")]
    Unknown(String),
}

impl GatewayError {
    /// 错误分类对应的 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::UpstreamRequest(_) => 400,
            Self::UpstreamAuth(_) => 401,
            Self::Transport(_) => 408,
            Self::PayloadTooLarge(_) => 413,
            Self::UpstreamRateLimit(_) => 429,
            Self::UpstreamServer(_) | Self::Unknown(_) => 500,
        }
    }

    /// 稳定的错误分类码，用于日志与诊断。
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::UpstreamRequest(_) => "upstream_request",
            Self::UpstreamAuth(_) => "upstream_auth",
            Self::UpstreamRateLimit(_) => "upstream_rate_limit",
            Self::UpstreamServer(_) => "upstream_server",
            Self::Transport(_) => "transport",
            Self::Unknown(_) => "unknown",
        }
    }
}
