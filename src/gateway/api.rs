//! # 网关数据模型
//!
//! ## 设计思路
//!
//! 将“本系统的请求/响应形态”与“上游 OpenAI 风格的线上格式”分开声明：
//! 前者是本系统的对外契约（`camelCase` JSON），后者只在提交与解析
//! 阶段出现。两套模型互不混用，升级上游格式不影响对外契约。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 上传文件载荷：字节 + 声明类型 + 文件名。
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub bytes: Bytes,
    /// 调用方声明的 MIME 类型（必须以 `image/` 开头）。
    pub content_type: String,
    pub file_name: String,
}

impl FilePayload {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            file_name: file_name.into(),
        }
    }
}

/// 一次编辑提交：图片 + 遮罩 + 提示词。
///
/// 文件字段用 `Option` 表达“可能缺失”，由网关统一校验。
#[derive(Debug, Clone, Default)]
pub struct EditRequest {
    pub image: Option<FilePayload>,
    pub mask: Option<FilePayload>,
    pub prompt: String,
}

/// 成功响应体：`{"success": true, "editedImageUrl": "..."}`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSuccessBody {
    pub success: bool,
    pub edited_image_url: String,
}

/// 健康检查响应体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    /// ISO-8601 时间戳。
    pub timestamp: String,
}

/// 对外响应信封：状态码 + JSON 体。
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// 上游编辑接口的成功响应（OpenAI 风格）。
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamEditResponse {
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub data: Vec<UpstreamImageDatum>,
}

/// 上游返回的单张图片：URL 或内联 base64 二选一。
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamImageDatum {
    pub url: Option<String>,
    pub b64_json: Option<String>,
    pub revised_prompt: Option<String>,
}

/// 上游错误响应体。
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: UpstreamErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_serializes_camel_case() {
        let body = EditSuccessBody {
            success: true,
            edited_image_url: "https://example.com/edited.png".to_string(),
        };
        let json = serde_json::to_value(&body).expect("serialize success body");

        assert_eq!(json["success"], true);
        assert_eq!(json["editedImageUrl"], "https://example.com/edited.png");
    }

    #[test]
    fn upstream_response_tolerates_missing_fields() {
        let parsed: UpstreamEditResponse =
            serde_json::from_str(r#"{"data":[{"url":"https://x/y.png"}]}"#)
                .expect("partial upstream body should parse");

        assert_eq!(parsed.created, 0);
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].url.as_deref(), Some("https://x/y.png"));
        assert!(parsed.data[0].b64_json.is_none());
        assert!(parsed.data[0].revised_prompt.is_none());
    }

    #[test]
    fn upstream_error_body_parses() {
        let parsed: UpstreamErrorBody = serde_json::from_str(
            r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#,
        )
        .expect("upstream error body should parse");

        assert_eq!(parsed.error.message, "Rate limit reached");
        assert_eq!(parsed.error.code.as_deref(), Some("rate_limit_exceeded"));
    }
}
