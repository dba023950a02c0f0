//! # 编辑请求网关（gateway）
//!
//! ## 设计思路
//!
//! 网关是系统里唯一会产生网络流量的部分，按职责拆为：
//!
//! - `service`：校验、提示词组装、单次上游调用、结果归一化
//! - `api`：对外契约模型与上游线上格式模型
//! - `config`：接入参数与产品契约常量（4MB 硬上限、1024x1024 输出）
//! - `error`：错误分类 → 状态码 + 英文文案的集中映射
//!
//! 对外响应语义与原始 HTTP 接口一一对应：成功 200
//! `{"success":true,"editedImageUrl":...}`，失败
//! `{"error":...}` + 400/401/408/413/429/500。

mod api;
mod config;
mod error;
mod service;

pub use api::{
    ApiResponse, EditRequest, EditSuccessBody, FilePayload, HealthBody, UpstreamEditResponse,
    UpstreamErrorBody, UpstreamErrorDetail, UpstreamImageDatum,
};
pub use config::{GatewayConfig, MAX_FILE_BYTES, OUTPUT_SIZE};
pub use error::GatewayError;
pub use service::EditGateway;
