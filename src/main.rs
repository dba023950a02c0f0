//! # AI 图片遮罩编辑工具 — 应用入口
//!
//! 本文件仅负责参数解析与流程编排（加载 → 压缩 → 绘制 → 提交 → 落盘）。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use inpaint_studio::editor::{EditSession, EditorConfig, ImageInput, compressor, loader};
use inpaint_studio::error::AppError;
use inpaint_studio::gateway::{EditGateway, EditRequest, FilePayload, GatewayConfig};

#[derive(Parser)]
#[command(
    name = "inpaint-studio",
    version,
    about = "加载图片、绘制编辑遮罩并调用生成式编辑 API"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 完整编辑流程：加载 → 压缩 → 绘制/导入遮罩 → 提交 → 保存结果
    Edit {
        /// 输入图片路径
        #[arg(long)]
        image: PathBuf,
        /// 编辑提示词
        #[arg(long)]
        prompt: String,
        /// 已有遮罩图路径（与 --stroke 互斥；尺寸须与压缩后的画布一致）
        #[arg(long, conflicts_with = "strokes")]
        mask: Option<PathBuf>,
        /// 笔画折线，视图坐标："x1,y1 x2,y2 ..."，可重复传入
        #[arg(long = "stroke")]
        strokes: Vec<String>,
        /// 画笔直径（控件范围 20~500px）
        #[arg(long, default_value_t = 40)]
        brush_size: u32,
        /// 显示视图尺寸 "WxH"，缺省时与画布原生尺寸一致
        #[arg(long)]
        view_size: Option<String>,
        /// 另存一份 alpha 遮罩到该路径
        #[arg(long)]
        save_mask: Option<PathBuf>,
        /// 编辑结果输出路径
        #[arg(long, default_value = "edited-image.png")]
        output: PathBuf,
    },
    /// 仅生成遮罩产物：加载 → 压缩 → 绘制 → 保存 PNG
    Mask {
        /// 输入图片路径
        #[arg(long)]
        image: PathBuf,
        /// 笔画折线，视图坐标："x1,y1 x2,y2 ..."，可重复传入
        #[arg(long = "stroke")]
        strokes: Vec<String>,
        /// 画笔直径（控件范围 20~500px）
        #[arg(long, default_value_t = 40)]
        brush_size: u32,
        /// 显示视图尺寸 "WxH"，缺省时与画布原生尺寸一致
        #[arg(long)]
        view_size: Option<String>,
        /// 另存一份着色预览（源图 + 遮罩叠加）到该路径
        #[arg(long)]
        preview: Option<PathBuf>,
        /// 遮罩输出路径
        #[arg(long, default_value = "mask.png")]
        output: PathBuf,
    },
    /// 健康检查：输出服务状态与时间戳
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Edit {
            image,
            prompt,
            mask,
            strokes,
            brush_size,
            view_size,
            save_mask,
            output,
        } => {
            run_edit(
                &image,
                &prompt,
                mask.as_deref(),
                &strokes,
                brush_size,
                view_size.as_deref(),
                save_mask.as_deref(),
                &output,
            )
            .await
        }
        Command::Mask {
            image,
            strokes,
            brush_size,
            view_size,
            preview,
            output,
        } => run_mask(
            &image,
            &strokes,
            brush_size,
            view_size.as_deref(),
            preview.as_deref(),
            &output,
        ),
        Command::Health => run_health(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run_edit(
    image: &Path,
    prompt: &str,
    mask: Option<&Path>,
    strokes: &[String],
    brush_size: u32,
    view_size: Option<&str>,
    save_mask: Option<&Path>,
    output: &Path,
) -> Result<(), AppError> {
    log::info!("edit: begin");
    let session = build_session(image, strokes, brush_size, view_size, mask)?;

    let mask_png = session.alpha_mask_png()?;
    if let Some(path) = save_mask {
        std::fs::write(path, &mask_png)?;
        log::info!("💾 遮罩已保存 - {}", path.display());
    }

    let request = EditRequest {
        image: Some(FilePayload::new(
            session.source_bytes().to_vec(),
            session.source_mime(),
            source_file_name(session.source_mime()),
        )),
        mask: Some(FilePayload::new(mask_png, "image/png", "mask.png")),
        prompt: prompt.to_string(),
    };

    let gateway = EditGateway::new(GatewayConfig::from_env())?;
    match gateway.submit(request).await {
        Ok(success) => {
            println!(
                "{}",
                serde_json::json!({
                    "success": success.success,
                    "editedImageUrl": success.edited_image_url,
                })
            );
            let bytes = gateway.fetch_result(&success.edited_image_url).await?;
            std::fs::write(output, &bytes)?;
            log::info!("💾 编辑结果已保存 - {}", output.display());
            Ok(())
        }
        Err(err) => {
            // 与 HTTP 接口语义保持一致：stdout 输出响应体，状态经退出码表达。
            println!("{}", serde_json::json!({ "error": err.to_string() }));
            Err(err.into())
        }
    }
}

fn run_mask(
    image: &Path,
    strokes: &[String],
    brush_size: u32,
    view_size: Option<&str>,
    preview: Option<&Path>,
    output: &Path,
) -> Result<(), AppError> {
    log::info!("mask: begin");
    let session = build_session(image, strokes, brush_size, view_size, None)?;

    if session.mask_coverage() == 0 {
        log::warn!("⚠️ 未绘制任何笔画，导出的遮罩为全透明（全部保留）");
    }

    if let Some(path) = preview {
        std::fs::write(path, session.overlay_png()?)?;
        log::info!("💾 着色预览已保存 - {}", path.display());
    }

    std::fs::write(output, session.alpha_mask_png()?)?;
    log::info!("💾 遮罩已保存 - {}", output.display());
    Ok(())
}

fn run_health() -> Result<(), AppError> {
    let gateway = EditGateway::new(GatewayConfig::default())?;
    let health = gateway.health();
    println!(
        "{}",
        serde_json::json!({ "status": health.status, "timestamp": health.timestamp })
    );
    Ok(())
}

/// 组装编辑会话：加载 → 压缩 → 画笔/视图设置 → 遮罩来源（笔画或外部文件）。
fn build_session(
    image: &Path,
    strokes: &[String],
    brush_size: u32,
    view_size: Option<&str>,
    external_mask: Option<&Path>,
) -> Result<EditSession, AppError> {
    let image_path = image
        .to_str()
        .ok_or_else(|| AppError::Usage("图片路径不是合法 UTF-8".to_string()))?;

    let config = EditorConfig::default();
    let raw = loader::load(ImageInput::FilePath(image_path.to_string()), &config)?;
    let prepared = compressor::compress_to_budget(&raw.bytes, &config)?;

    let mut session = EditSession::new(prepared, config.clone())?;
    session.set_brush_diameter(brush_size);

    if let Some(value) = view_size {
        let (width, height) = parse_view_size(value)?;
        session.set_view_size(width, height)?;
    }

    if let Some(path) = external_mask {
        let mask_path = path
            .to_str()
            .ok_or_else(|| AppError::Usage("遮罩路径不是合法 UTF-8".to_string()))?;
        let mask_raw = loader::load_from_file(mask_path, &config)?;
        let mask_pixels = loader::decode_rgba(&mask_raw.bytes)?;
        session.set_mask_from_image(&mask_pixels)?;
    } else {
        for stroke in strokes {
            apply_stroke(&mut session, stroke)?;
        }
    }

    Ok(session)
}

/// 把一条 "x1,y1 x2,y2 ..." 折线落到会话遮罩上。
fn apply_stroke(session: &mut EditSession, stroke: &str) -> Result<(), AppError> {
    let mut points = stroke.split_whitespace().map(parse_point);

    let first = points
        .next()
        .ok_or_else(|| AppError::Usage("笔画不能为空，格式应为 \"x,y x,y ...\"".to_string()))??;

    session.begin_stroke(first.0, first.1);
    for point in points {
        let (x, y) = point?;
        session.extend_stroke(x, y);
    }
    session.end_stroke();
    Ok(())
}

fn parse_point(token: &str) -> Result<(f32, f32), AppError> {
    let (x, y) = token
        .split_once(',')
        .ok_or_else(|| AppError::Usage(format!("坐标格式错误：{}（应为 x,y）", token)))?;
    let x: f32 = x
        .trim()
        .parse()
        .map_err(|_| AppError::Usage(format!("坐标不是数字：{}", token)))?;
    let y: f32 = y
        .trim()
        .parse()
        .map_err(|_| AppError::Usage(format!("坐标不是数字：{}", token)))?;
    Ok((x, y))
}

fn parse_view_size(value: &str) -> Result<(f32, f32), AppError> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| AppError::Usage(format!("视图尺寸格式错误：{}（应为 WxH）", value)))?;
    let width: f32 = width
        .trim()
        .parse()
        .map_err(|_| AppError::Usage(format!("视图宽度不是数字：{}", value)))?;
    let height: f32 = height
        .trim()
        .parse()
        .map_err(|_| AppError::Usage(format!("视图高度不是数字：{}", value)))?;
    Ok((width, height))
}

/// 按压缩输出的 MIME 推导上传文件名。
fn source_file_name(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "image.jpg",
        "image/webp" => "image.webp",
        _ => "image.png",
    }
}
