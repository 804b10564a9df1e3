//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示输入字符串的来源语义（按前缀识别）
//! - `RawImageData` 表示已加载但未解码的字节
//! - `NormalizedImage` 表示最终可直接落库的 data URI 及其几何信息

use bytes::Bytes;

/// 输入字符串的来源分类。
///
/// 识别顺序固定：空白 → URL → data URI → 裸 Base64。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// 空字符串或仅含空白，直接原样返回。
    Blank,
    /// `http://` 或 `https://` 开头的网络地址。
    Url(&'a str),
    /// `data:image` 开头的 data URI。
    DataUri(&'a str),
    /// 其余输入，按裸 Base64 尝试解码。
    RawBase64(&'a str),
}

impl<'a> ImageSource<'a> {
    /// 按前缀识别输入来源。
    ///
    /// # 示例
    /// ```rust
    /// use project_image_normalizer::image_normalizer::ImageSource;
    ///
    /// assert_eq!(ImageSource::classify("   "), ImageSource::Blank);
    /// assert!(matches!(ImageSource::classify("https://a.b/c.png"), ImageSource::Url(_)));
    /// ```
    pub fn classify(input: &'a str) -> Self {
        if input.trim().is_empty() {
            Self::Blank
        } else if input.starts_with("http://") || input.starts_with("https://") {
            Self::Url(input)
        } else if input.starts_with("data:image") {
            Self::DataUri(input)
        } else {
            Self::RawBase64(input)
        }
    }

    /// 来源标识（用于日志与诊断）。
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::Url(_) => "url",
            Self::DataUri(_) => "data-uri",
            Self::RawBase64(_) => "base64",
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 编码后的图片字节。
    pub(crate) bytes: Bytes,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 居中裁剪区域（原图坐标系）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 规范化结果。
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// `data:image/jpeg;base64,...` 字符串。
    pub data_uri: String,
    /// 输出宽度。
    pub width: u32,
    /// 输出高度。
    pub height: u32,
    /// 解码后原图尺寸。
    pub original_size: (u32, u32),
    /// 缩放前实际使用的裁剪区域。
    pub crop: CropRect,
}
