//! # AI 图片遮罩编辑工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 入口 (CLI: edit / mask / health)          │
//! │                                                          │
//! │   参数解析 (clap) ── 产物落盘 (mask.png / edited-image)   │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                            │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ editor ───── 加载·压缩·绘制·预览·遮罩导出              │
//! │  │   ├─ loader      文件/Base64 加载 + 签名校验           │
//! │  │   ├─ compressor  预算内降质重编码                      │
//! │  │   ├─ session     EditSession (画笔/遮罩/视图映射)      │
//! │  │   ├─ overlay     着色预览（派生视图）                   │
//! │  │   └─ mask        遮罩 → 二值 alpha → 无损 PNG          │
//! │  │                                                       │
//! │  └─ gateway ──── 校验·提示词组装·上游调用·结果归一化        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，CLI 入口的返回类型 |
//! | [`editor`] | 图片加载、预算压缩、遮罩绘制、预览渲染、alpha 导出 |
//! | [`gateway`] | 请求校验、外部编辑 API 调用、响应/错误归一化、健康检查 |

pub mod editor;
pub mod error;
pub mod gateway;
