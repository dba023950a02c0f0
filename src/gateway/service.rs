//! # 网关服务层
//!
//! ## 设计思路
//!
//! `EditGateway` 是一个无状态的请求/响应服务：校验 → 组装提示词 →
//! 单次上游调用 → 归一化结果。全部校验在任何网络流量之前完成，
//! 校验失败绝不产生外部调用。
//!
//! 单次提交只有一个在途请求，整个调用被 `await` 串行化；
//! 不做内部重试，不做取消——失败即终态，由用户手动重新提交。
//!
//! ## 实现思路
//!
//! - 复用型 HTTP 客户端在构造时建好（连接/整体超时一次配置）。
//! - 上游失败按状态码映射到对外分类；传输层异常按描述特判
//!   “连接重置/超时”，给出“文件可能过大”的补救提示。
//! - 成功响应归一化为直接 URL 或 base64 Data URI 两种形态之一。

use std::time::{Duration, Instant};

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use reqwest::multipart::{Form, Part};

use super::config::OUTPUT_SIZE;
use super::{
    ApiResponse, EditRequest, EditSuccessBody, FilePayload, GatewayConfig, GatewayError,
    HealthBody, UpstreamEditResponse, UpstreamErrorBody,
};

const MSG_MISSING_FILES: &str = "Both image and mask files are required.";
const MSG_NOT_AN_IMAGE: &str = "Only image files are accepted for the image and mask fields.";
const MSG_FILE_TOO_LARGE: &str = "File too large. Maximum size is 4MB per file.";
const MSG_PROMPT_REQUIRED: &str = "Prompt is required.";
const MSG_AUTH: &str = "Invalid API key configuration. Please check the service credentials.";
const MSG_RATE_LIMIT: &str = "Rate limit exceeded. Please wait a moment and try again.";
const MSG_UPSTREAM_REQUEST: &str =
    "The edit request was rejected by the image service. Please try a different image or prompt.";
const MSG_UPSTREAM_SERVER: &str =
    "The image editing service encountered an unexpected error. Please try again.";
const MSG_TRANSPORT: &str = "The connection was interrupted before the edit completed. \
The file may be too large to upload — please try a smaller image.";
const MSG_EMPTY_RESULT: &str = "The image editing service returned no image.";

/// 固定的提示词前导：限定编辑范围、要求保留未遮罩区域并自然融合。
const PROMPT_PREAMBLE: &str = "Apply the requested edit only to the regions marked by the mask. \
Preserve the structure, lighting, and all visual elements of the unmasked regions exactly as they \
are, and blend the edited regions naturally and seamlessly into the surrounding image.";

/// 编辑请求网关。
///
/// # 示例
/// ```rust,ignore
/// use inpaint_studio::gateway::{EditGateway, GatewayConfig};
///
/// let gateway = EditGateway::new(GatewayConfig::from_env())?;
/// let response = gateway.handle_edit_request(request).await;
/// assert_eq!(response.status, 200);
/// # Ok::<(), inpaint_studio::gateway::GatewayError>(())
/// ```
pub struct EditGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl EditGateway {
    /// 根据配置创建网关，同时构建复用型 HTTP 客户端。
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Unknown(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 健康检查：始终成功，返回当前时间戳。
    pub fn health(&self) -> HealthBody {
        HealthBody {
            status: "ok".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// 处理一次编辑请求，产出“状态码 + JSON 体”的对外响应。
    ///
    /// 对应关系：成功 → 200 `{"success":true,"editedImageUrl":...}`；
    /// 失败 → 分类状态码 + `{"error":...}`。
    pub async fn handle_edit_request(&self, request: EditRequest) -> ApiResponse {
        match self.submit(request).await {
            Ok(success) => ApiResponse {
                status: 200,
                body: serde_json::json!({
                    "success": success.success,
                    "editedImageUrl": success.edited_image_url,
                }),
            },
            Err(err) => {
                log::warn!(
                    "⚠️ 编辑请求失败 - 分类 {} 状态 {} 文案 {}",
                    err.kind(),
                    err.status_code(),
                    err
                );
                ApiResponse {
                    status: err.status_code(),
                    body: serde_json::json!({ "error": err.to_string() }),
                }
            }
        }
    }

    /// 校验并提交一次编辑请求（单次网络往返，无重试）。
    pub async fn submit(&self, request: EditRequest) -> Result<EditSuccessBody, GatewayError> {
        let (image, mask) = self.validate(&request)?;
        let prompt = compose_prompt(request.prompt.trim());

        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GatewayError::UpstreamAuth(MSG_AUTH.to_string()))?;

        log::info!(
            "🚀 提交编辑请求 - 图片 {} KB 遮罩 {} KB 提示词 {} 字符 模型 {}",
            image.bytes.len() / 1024,
            mask.bytes.len() / 1024,
            request.prompt.trim().chars().count(),
            self.config.model
        );

        let form = Form::new()
            .part("image", file_part(image)?)
            .part("mask", file_part(mask)?)
            .text("prompt", prompt)
            .text("model", self.config.model.clone())
            .text("n", "1")
            .text("size", OUTPUT_SIZE)
            .text("response_format", "url");

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/images/edits", self.config.api_base))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(map_upstream_failure(status, &body));
        }

        let parsed: UpstreamEditResponse = response.json().await.map_err(|e| {
            GatewayError::UpstreamServer(format!("{} ({})", MSG_UPSTREAM_SERVER, e))
        })?;
        let edited_image_url = normalize_result(parsed)?;

        log::info!("✅ 编辑完成 - 耗时 {}ms", started.elapsed().as_millis());

        Ok(EditSuccessBody {
            success: true,
            edited_image_url,
        })
    }

    /// 下载（或解码）编辑结果，供保存为本地产物。
    pub async fn fetch_result(&self, target: &str) -> Result<Vec<u8>, GatewayError> {
        if target.starts_with("data:") {
            let base64_start = target.find(";base64,").ok_or_else(|| {
                GatewayError::UpstreamServer("The returned data URI is malformed.".to_string())
            })?;
            return general_purpose::STANDARD
                .decode(&target[base64_start + 8..])
                .map_err(|e| {
                    GatewayError::UpstreamServer(format!(
                        "Failed to decode the returned image data: {}",
                        e
                    ))
                });
        }

        log::info!("📥 下载编辑结果");
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(GatewayError::UpstreamServer(format!(
                "Failed to download the edited image (status {}).",
                response.status().as_u16()
            )));
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if bytes.len() as u64 > self.config.max_result_bytes {
            return Err(GatewayError::UpstreamServer(
                "The edited image exceeds the allowed download size.".to_string(),
            ));
        }

        Ok(bytes.to_vec())
    }

    /// 请求校验：文件在场 → 类型 → 体积 → 提示词，全部先于网络流量。
    fn validate<'a>(
        &self,
        request: &'a EditRequest,
    ) -> Result<(&'a FilePayload, &'a FilePayload), GatewayError> {
        let image = request
            .image
            .as_ref()
            .filter(|file| !file.bytes.is_empty());
        let mask = request.mask.as_ref().filter(|file| !file.bytes.is_empty());

        let (image, mask) = match (image, mask) {
            (Some(image), Some(mask)) => (image, mask),
            _ => return Err(GatewayError::Validation(MSG_MISSING_FILES.to_string())),
        };

        for file in [image, mask] {
            if !file.content_type.starts_with("image/") || !has_image_signature(&file.bytes) {
                return Err(GatewayError::Validation(MSG_NOT_AN_IMAGE.to_string()));
            }
        }

        for file in [image, mask] {
            if file.bytes.len() as u64 > self.config.max_file_bytes {
                return Err(GatewayError::PayloadTooLarge(MSG_FILE_TOO_LARGE.to_string()));
            }
        }

        if request.prompt.trim().is_empty() {
            return Err(GatewayError::Validation(MSG_PROMPT_REQUIRED.to_string()));
        }

        Ok((image, mask))
    }
}

/// 字节签名确属图片类型。声明类型可以伪造，魔数不会。
fn has_image_signature(bytes: &[u8]) -> bool {
    infer::get(bytes)
        .map(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .unwrap_or(false)
}

fn file_part(payload: &FilePayload) -> Result<Part, GatewayError> {
    Part::bytes(payload.bytes.to_vec())
        .file_name(payload.file_name.clone())
        .mime_str(&payload.content_type)
        .map_err(|e| GatewayError::Validation(format!("Invalid content type: {}", e)))
}

/// 将用户提示词包进固定前导。
fn compose_prompt(user_prompt: &str) -> String {
    format!("{} Requested edit: {}", PROMPT_PREAMBLE, user_prompt)
}

/// 上游非 2xx 状态 → 对外错误分类。
fn map_upstream_failure(status: u16, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<UpstreamErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            let mut snippet: String = trimmed.chars().take(200).collect();
            if snippet.len() < trimmed.len() {
                snippet.push('…');
            }
            snippet
        });

    log::warn!("⚠️ 上游返回错误 - 状态 {} 详情 {}", status, detail);

    match status {
        400 => GatewayError::UpstreamRequest(MSG_UPSTREAM_REQUEST.to_string()),
        401 | 403 => GatewayError::UpstreamAuth(MSG_AUTH.to_string()),
        408 => GatewayError::Transport(MSG_TRANSPORT.to_string()),
        413 => GatewayError::PayloadTooLarge(MSG_FILE_TOO_LARGE.to_string()),
        429 => GatewayError::UpstreamRateLimit(MSG_RATE_LIMIT.to_string()),
        _ => GatewayError::UpstreamServer(MSG_UPSTREAM_SERVER.to_string()),
    }
}

/// 传输层异常 → 对外错误分类。
///
/// 连接重置没有专属错误类型，只能按描述文本特判；超时与连接失败
/// 一并归入“传输”类，提示文件可能过大。
fn map_transport_error(err: reqwest::Error) -> GatewayError {
    let description = err.to_string();
    let lowered = description.to_ascii_lowercase();
    let connection_reset = lowered.contains("connection reset")
        || lowered.contains("reset by peer")
        || lowered.contains("econnreset");

    if err.is_timeout() || err.is_connect() || connection_reset {
        return GatewayError::Transport(MSG_TRANSPORT.to_string());
    }

    GatewayError::Unknown(description)
}

/// 上游成功响应 → 直接 URL 或 base64 Data URI。
fn normalize_result(parsed: UpstreamEditResponse) -> Result<String, GatewayError> {
    let datum = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::UpstreamServer(MSG_EMPTY_RESULT.to_string()))?;

    if let Some(url) = datum.url.filter(|url| !url.is_empty()) {
        return Ok(url);
    }
    if let Some(b64) = datum.b64_json.filter(|b64| !b64.is_empty()) {
        return Ok(format!("data:image/png;base64,{}", b64));
    }

    Err(GatewayError::UpstreamServer(MSG_EMPTY_RESULT.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::UpstreamImageDatum;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;
    use tokio::runtime::Runtime;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, 128, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn gateway_without_key() -> EditGateway {
        EditGateway::new(GatewayConfig::default()).expect("gateway should build")
    }

    fn valid_request(prompt: &str) -> EditRequest {
        let png = create_png_bytes(8, 8);
        EditRequest {
            image: Some(FilePayload::new(png.clone(), "image/png", "image.png")),
            mask: Some(FilePayload::new(png, "image/png", "mask.png")),
            prompt: prompt.to_string(),
        }
    }

    #[test]
    fn empty_prompt_never_reaches_network() {
        let gateway = gateway_without_key();
        let runtime = Runtime::new().expect("runtime init failed");

        for prompt in ["", "   ", "\t\n"] {
            let response = runtime.block_on(gateway.handle_edit_request(valid_request(prompt)));
            assert_eq!(response.status, 400);
            assert_eq!(response.body["error"], MSG_PROMPT_REQUIRED);
        }
    }

    #[test]
    fn missing_files_are_rejected_together() {
        let gateway = gateway_without_key();
        let runtime = Runtime::new().expect("runtime init failed");

        let mut request = valid_request("add a pond");
        request.mask = None;
        let response = runtime.block_on(gateway.handle_edit_request(request));
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], MSG_MISSING_FILES);

        let mut request = valid_request("add a pond");
        request.image = Some(FilePayload::new(Vec::new(), "image/png", "image.png"));
        let response = runtime.block_on(gateway.handle_edit_request(request));
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], MSG_MISSING_FILES);
    }

    #[test]
    fn non_image_payload_is_rejected() {
        let gateway = gateway_without_key();
        let runtime = Runtime::new().expect("runtime init failed");

        // 声明类型错误。
        let mut request = valid_request("add a pond");
        request.image = Some(FilePayload::new(
            create_png_bytes(8, 8),
            "application/pdf",
            "image.pdf",
        ));
        let response = runtime.block_on(gateway.handle_edit_request(request));
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], MSG_NOT_AN_IMAGE);

        // 声明类型正确但签名不是图片。
        let mut request = valid_request("add a pond");
        request.mask = Some(FilePayload::new(
            b"%PDF-1.7 nope".to_vec(),
            "image/png",
            "mask.png",
        ));
        let response = runtime.block_on(gateway.handle_edit_request(request));
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], MSG_NOT_AN_IMAGE);
    }

    #[test]
    fn oversized_file_maps_to_413() {
        let gateway = gateway_without_key();
        let runtime = Runtime::new().expect("runtime init failed");

        // 有效 PNG 签名 + 填充到超过 4MB：类型校验通过，体积校验拦截。
        let mut padded = create_png_bytes(8, 8);
        padded.resize(4 * 1024 * 1024 + 1, 0);

        let mut request = valid_request("add a pond");
        request.image = Some(FilePayload::new(padded, "image/png", "image.png"));
        let response = runtime.block_on(gateway.handle_edit_request(request));

        assert_eq!(response.status, 413);
        assert_eq!(response.body["error"], MSG_FILE_TOO_LARGE);
    }

    #[test]
    fn missing_api_key_maps_to_auth_error() {
        let gateway = gateway_without_key();
        let runtime = Runtime::new().expect("runtime init failed");

        let response = runtime.block_on(gateway.handle_edit_request(valid_request("add a pond")));
        assert_eq!(response.status, 401);
        assert_eq!(response.body["error"], MSG_AUTH);
    }

    #[test]
    fn upstream_rate_limit_maps_to_429() {
        let err = map_upstream_failure(429, r#"{"error":{"message":"slow down"}}"#);
        assert_eq!(err.status_code(), 429);
        assert!(err.to_string().starts_with("Rate limit exceeded"));
    }

    #[test]
    fn upstream_status_mapping_covers_contract() {
        assert_eq!(map_upstream_failure(400, "{}").status_code(), 400);
        assert_eq!(map_upstream_failure(401, "{}").status_code(), 401);
        assert_eq!(map_upstream_failure(403, "{}").status_code(), 401);
        assert_eq!(map_upstream_failure(408, "{}").status_code(), 408);
        assert_eq!(map_upstream_failure(413, "{}").status_code(), 413);
        assert_eq!(map_upstream_failure(500, "{}").status_code(), 500);
        assert_eq!(map_upstream_failure(502, "not json").status_code(), 500);
    }

    #[test]
    fn prompt_is_wrapped_in_preamble() {
        let composed = compose_prompt("add a pond");
        assert!(composed.starts_with("Apply the requested edit only"));
        assert!(composed.contains("blend the edited regions naturally"));
        assert!(composed.ends_with("Requested edit: add a pond"));
    }

    #[test]
    fn normalize_prefers_url_over_b64() {
        let parsed = UpstreamEditResponse {
            created: 0,
            data: vec![UpstreamImageDatum {
                url: Some("https://example.com/a.png".to_string()),
                b64_json: Some("aGVsbG8=".to_string()),
                revised_prompt: None,
            }],
        };
        assert_eq!(
            normalize_result(parsed).expect("url should normalize"),
            "https://example.com/a.png"
        );
    }

    #[test]
    fn normalize_wraps_b64_as_data_uri() {
        let parsed = UpstreamEditResponse {
            created: 0,
            data: vec![UpstreamImageDatum {
                url: None,
                b64_json: Some("aGVsbG8=".to_string()),
                revised_prompt: None,
            }],
        };
        assert_eq!(
            normalize_result(parsed).expect("b64 should normalize"),
            "data:image/png;base64,aGVsbG8="
        );
    }

    #[test]
    fn normalize_rejects_empty_data() {
        let parsed = UpstreamEditResponse {
            created: 0,
            data: vec![],
        };
        assert!(matches!(
            normalize_result(parsed),
            Err(GatewayError::UpstreamServer(_))
        ));
    }

    #[test]
    fn fetch_result_decodes_data_uri_locally() {
        let gateway = gateway_without_key();
        let runtime = Runtime::new().expect("runtime init failed");

        let bytes = runtime
            .block_on(gateway.fetch_result("data:image/png;base64,aGVsbG8="))
            .expect("data uri should decode without network");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn health_reports_ok_with_parseable_timestamp() {
        let gateway = gateway_without_key();
        let health = gateway.health();

        assert_eq!(health.status, "ok");
        chrono::DateTime::parse_from_rfc3339(&health.timestamp)
            .expect("timestamp should be ISO-8601");
    }
}
