//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / Base64）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗：零字节与非图片签名的输入
//! 在进入解码与压缩之前就被拦截。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取 + 签名校验。
//! - Base64：格式解析 + 解码前体积预估 + 解码后签名校验。
//! - 所有失败统一映射到 `EditError`，便于上层处理。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use image::RgbaImage;

use super::source::{ImageInput, RawImageData};
use super::{EditError, EditorConfig};

/// 按来源加载图片原始字节。
pub fn load(input: ImageInput, config: &EditorConfig) -> Result<RawImageData, EditError> {
    match input {
        ImageInput::FilePath(path) => load_from_file(&path, config),
        ImageInput::Base64(data) => load_from_base64(&data, config),
    }
}

/// 从本地路径加载图片原始字节。
pub fn load_from_file(path: &str, config: &EditorConfig) -> Result<RawImageData, EditError> {
    log::info!("📁 开始读取本地图片 - 路径: {}", path);

    let file_path = Path::new(path);
    if !file_path.exists() {
        return Err(EditError::FileSystem(format!("文件不存在：{}", path)));
    }

    let metadata = std::fs::metadata(file_path)
        .map_err(|e| EditError::FileSystem(format!("无法读取文件信息：{}", e)))?;

    if metadata.len() > config.max_input_bytes {
        return Err(EditError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_input_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = std::fs::read(file_path)
        .map_err(|e| EditError::FileSystem(format!("无法读取图片文件：{}", e)))?;
    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_hint: "file",
    })
}

/// 从 Base64 字符串加载图片原始字节。
pub fn load_from_base64(data: &str, config: &EditorConfig) -> Result<RawImageData, EditError> {
    log::info!("📝 开始处理 base64 图片");

    let bytes = parse_base64_with_limit(data, config.max_input_bytes)?;

    if bytes.len() as u64 > config.max_input_bytes {
        return Err(EditError::ResourceLimit(format!(
            "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
            bytes.len() as f64 / 1024.0 / 1024.0,
            config.max_input_bytes as f64 / 1024.0 / 1024.0
        )));
    }
    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_hint: "base64",
    })
}

/// 将原始字节完整解码为 RGBA 像素。
///
/// 零字节与无法解码的输入在此处失败并上报，调用侧必须中止后续流程。
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, EditError> {
    if bytes.is_empty() {
        return Err(EditError::Decode("图片内容为空，无法解码".to_string()));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| EditError::Decode(format!("图片解码失败：{}", e)))?;

    Ok(decoded.to_rgba8())
}

/// 校验字节签名确实属于图片类型。
///
/// 仅检查魔数，不做完整解码，用于在重操作之前快速拒绝。
pub fn validate_image_signature(bytes: &[u8]) -> Result<(), EditError> {
    if bytes.is_empty() {
        return Err(EditError::InvalidFormat("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| EditError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(EditError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// 根据字节签名推断 MIME 类型，无法识别时返回 `None`。
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

fn parse_base64_with_limit(data: &str, max_input_bytes: u64) -> Result<Vec<u8>, EditError> {
    let normalized = data.trim();

    let base64_data = if normalized.starts_with("data:image/") {
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| EditError::InvalidFormat("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(base64_data)?;
    if estimated_len > max_input_bytes {
        return Err(EditError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_input_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| EditError::Decode(format!("Base64 解码失败：{}", e)))
}

/// 在解码前按编码长度估算解码后体积上界，避免先解码再拒绝。
fn estimate_base64_decoded_upper_bound_len(data: &str) -> Result<u64, EditError> {
    let len = data.len() as u64;
    len.checked_mul(3)
        .map(|n| n / 4)
        .ok_or_else(|| EditError::ResourceLimit("Base64 体积估算溢出".to_string()))
}
