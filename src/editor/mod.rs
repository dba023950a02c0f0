//! # 图片编辑模块（editor）
//!
//! ## 设计思路
//!
//! 该模块将“加载校验 → 压缩 → 会话绘制 → 预览渲染 → 遮罩导出”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `loader`：负责文件/Base64 加载与安全校验
//! - `compressor`：负责预算内重编码（降质 + 降采样阶梯）
//! - `session`：承载一次编辑的全部可变状态（画笔、遮罩、视图映射）
//! - `overlay`：负责着色预览的派生渲染
//! - `mask`：负责遮罩 → 二值 alpha 光栅的导出与无损编码
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 入口（CLI / 调用方）
//!    ↓
//! loader.rs（来源加载 + 体积/签名校验）
//!    ↓
//! compressor.rs（预算判断 + 降质降采样循环）
//!    ↓
//! session.rs（EditSession：笔画 → 遮罩缓冲）
//!    ├─ overlay.rs（源图 + 遮罩 → 着色预览）
//!    └─ mask.rs（遮罩 → alpha 光栅 → PNG）
//!    ↓
//! gateway（提交外部编辑 API，见 crate::gateway）
//! ```
//!
//! ## 分层职责建议
//!
//! - 输入形态变更（新来源/新校验）优先改 `loader.rs`
//! - 压缩策略变更优先改 `config.rs` 与 `compressor.rs`
//! - 绘制交互语义变更优先改 `session.rs`
//! - 遮罩契约（阈值/映射）永远同时核对 `mask.rs` 与外部 API 文档

pub mod compressor;
mod config;
mod error;
pub mod loader;
mod mask;
mod overlay;
mod session;
mod source;

pub use config::{COMPRESS_BYTE_BUDGET, EditorConfig, MASK_BINARIZE_THRESHOLD};
pub use error::EditError;
pub use mask::{encode_mask_png, export_alpha_mask};
pub use overlay::render_overlay;
pub use session::EditSession;
pub use source::{ImageInput, PreparedSource, RawImageData};
