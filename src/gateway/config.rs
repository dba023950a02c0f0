//! # 网关配置模块
//!
//! ## 设计思路
//!
//! 外部编辑 API 的接入参数（端点、密钥、模型、超时）与产品契约常量
//! （文件硬上限、输出分辨率）集中在 `GatewayConfig`。密钥只从环境变量
//! 读取，不落盘、不进日志。

/// 单个文件的硬上限（字节），与外部 API 的 4MB 限制一致。
pub const MAX_FILE_BYTES: u64 = 4 * 1024 * 1024;

/// 请求外部 API 生成的输出分辨率（固定单张）。
pub const OUTPUT_SIZE: &str = "1024x1024";

/// 编辑网关配置。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 外部 API 基地址（不含 `/images/edits` 路径）。
    pub api_base: String,
    /// Bearer 密钥；缺失时提交阶段直接报配置错误。
    pub api_key: Option<String>,
    /// 编辑模型名。
    pub model: String,
    /// 整次请求超时（秒）。
    pub request_timeout_secs: u64,
    /// 建立连接（TCP/TLS）超时（秒）。
    pub connect_timeout_secs: u64,
    /// 单个上传文件的硬上限（字节）。
    pub max_file_bytes: u64,
    /// 下载编辑结果时允许的最大体积（字节）。
    pub max_result_bytes: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "dall-e-2".to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 8,
            max_file_bytes: MAX_FILE_BYTES,
            max_result_bytes: 32 * 1024 * 1024,
        }
    }
}

impl GatewayConfig {
    /// 从环境变量构建配置。
    ///
    /// - `OPENAI_API_KEY`：密钥（必需，缺失时延迟到提交阶段报错）
    /// - `OPENAI_BASE_URL`：基地址覆盖
    /// - `OPENAI_IMAGE_MODEL`：模型覆盖
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            if !base.trim().is_empty() {
                config.api_base = base.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(model) = std::env::var("OPENAI_IMAGE_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }

        if config.api_key.is_none() {
            log::warn!("⚠️ 未配置 OPENAI_API_KEY，提交编辑请求将返回配置错误");
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_external_contract() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_file_bytes, 4_194_304);
        assert_eq!(OUTPUT_SIZE, "1024x1024");
        assert!(config.api_base.ends_with("/v1"));
    }
}
