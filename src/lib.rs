//! # 项目图片规范化：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │        记录创建 / 更新处理器（项目、客户）               │
//! │                    ↓ 图片字段（字符串）                   │
//! └────────────────────┼─────────────────────────────────────┘
//!                      ↓
//! ┌────────────────────┼─────────────────────────────────────┐
//! │  ┌─ records ────────── 请求体 + 图片字段规范化钩子          │
//! │  │                                                       │
//! │  └─ image_normalizer   URL / data URI / Base64            │
//! │      ├─ loader          下载 · Base64 解码 · 签名校验     │
//! │      ├─ pipeline        解码 · 白底合成 · 居中裁剪 · 缩放 │
//! │      └─ encoder         JPEG(85) → data URI               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`image_normalizer`] | 把任意图片输入规范化为 450×350 的 JPEG data URI，失败时原样返回 |
//! | [`records`] | 项目/客户请求体，落库前规范化其图片字段 |

pub mod image_normalizer;
pub mod records;

pub use image_normalizer::{
    ImageNormalizer, NormalizeError, NormalizerConfig, normalize, normalize_async, normalize_to,
};
