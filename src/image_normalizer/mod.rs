//! # 图片规范化模块（image_normalizer）
//!
//! ## 设计思路
//!
//! 项目、客户记录上的图片字段在落库前统一经过本模块：
//! 识别来源 → 加载字节 → 解码去透明 → 居中裁剪 → 缩放 → JPEG 编码为 data URI。
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `service`：默认实例、自由函数与异步包装
//! - `handler`：编排整条处理流水线（唯一的失败边界）
//! - `loader`：负责 URL / data URI / Base64 加载与校验
//! - `pipeline`：负责解码、像素限制、透明合成、裁剪与缩放
//! - `encoder`：负责 JPEG 编码与 data URI 封装
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 契约
//!
//! 输出要么是目标尺寸的 `data:image/jpeg;base64,...`，要么是原样的输入字符串，
//! 不会返回半成品，也不会向调用方抛出错误。
//!
//! ```text
//! normalize(input)
//!    ↓
//! handler.rs（识别来源 + 阶段耗时日志）
//!    ├─ loader.rs（下载 / Base64 解码 + 签名校验）
//!    ├─ pipeline.rs（解码 + 白底合成 + 裁剪 + 缩放）
//!    └─ encoder.rs（JPEG 质量 85 + data URI）
//!    ↓
//! 成功：data URI；失败：warn 日志 + 原样返回
//! ```

mod config;
mod encoder;
mod error;
mod handler;
mod loader;
mod pipeline;
mod service;
mod source;

pub use config::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_OUTPUT_PIXELS, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH,
    NormalizerConfig,
};
pub use encoder::JPEG_DATA_URI_PREFIX;
pub use error::NormalizeError;
pub use handler::ImageNormalizer;
pub use pipeline::center_crop_rect;
pub use service::{default_normalizer, normalize, normalize_async, normalize_to};
pub use source::{CropRect, ImageSource, NormalizedImage};
