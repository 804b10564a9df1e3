//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageNormalizer` 只负责流程编排与配置持有。处理链路固定为：
//! 1. 按前缀识别来源
//! 2. 加载原始字节（下载 / Base64 解码）
//! 3. 解码并转为不透明 RGB
//! 4. 居中裁剪 + 缩放
//! 5. JPEG 编码并封装 data URI
//!
//! ## 实现思路
//!
//! - 整条链路只有一个失败边界：`try_normalize_to` 返回 `Result`，
//!   `normalize_to` 在失败时记录一条 `warn` 日志并原样返回输入。
//! - 配置不可变，通过 `Arc` 在克隆间共享；HTTP 客户端首次下载时才构建。
//! - 记录 `load/decode/transform/encode` 阶段耗时，便于性能诊断。

use std::sync::Arc;
use std::time::Instant;

use image::GenericImageView;
use once_cell::sync::OnceCell;

use super::encoder::{encode_jpeg, to_data_uri};
use super::pipeline::{crop_and_resize, flatten_onto_white};
use super::source::{ImageSource, NormalizedImage};
use super::{NormalizeError, NormalizerConfig};

/// 图片规范化器。
///
/// 克隆成本低，可在线程间共享；每次调用独占自己的解码缓冲。
#[derive(Clone)]
pub struct ImageNormalizer {
    pub(super) config: Arc<NormalizerConfig>,
    pub(super) http_client: Arc<OnceCell<reqwest::blocking::Client>>,
}

impl std::fmt::Debug for ImageNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageNormalizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ImageNormalizer {
    /// 根据配置创建规范化器。
    ///
    /// # 示例
    /// ```rust
    /// use project_image_normalizer::image_normalizer::{ImageNormalizer, NormalizerConfig};
    ///
    /// let normalizer = ImageNormalizer::new(NormalizerConfig::default())?;
    /// assert_eq!(normalizer.normalize(""), "");
    /// # Ok::<(), project_image_normalizer::image_normalizer::NormalizeError>(())
    /// ```
    pub fn new(config: NormalizerConfig) -> Result<Self, NormalizeError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    pub(super) fn from_valid_config(config: NormalizerConfig) -> Self {
        Self {
            config: Arc::new(config),
            http_client: Arc::new(OnceCell::new()),
        }
    }

    /// 当前生效配置。
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// 按配置的目标尺寸规范化。失败时原样返回输入。
    pub fn normalize(&self, input: &str) -> String {
        self.normalize_to(input, self.config.target_width, self.config.target_height)
    }

    /// 规范化到指定尺寸。失败时原样返回输入，并记录一条诊断日志。
    pub fn normalize_to(&self, input: &str, target_width: u32, target_height: u32) -> String {
        match self.try_normalize_to(input, target_width, target_height) {
            Ok(Some(normalized)) => normalized.data_uri,
            Ok(None) => input.to_string(),
            Err(err) => {
                log::warn!(
                    "⚠️ 图片规范化失败，原样返回输入 - 阶段: {} 错误码: {} 原因: {}",
                    err.stage(),
                    err.code(),
                    err
                );
                input.to_string()
            }
        }
    }

    /// 可观测失败的规范化入口。
    ///
    /// - `Ok(Some(_))`：规范化成功
    /// - `Ok(None)`：输入为空白或不是 Base64，调用方应原样保留
    /// - `Err(_)`：链路中任一阶段失败
    pub fn try_normalize_to(
        &self,
        input: &str,
        target_width: u32,
        target_height: u32,
    ) -> Result<Option<NormalizedImage>, NormalizeError> {
        let source = ImageSource::classify(input);
        if source == ImageSource::Blank {
            return Ok(None);
        }
        if target_width == 0 || target_height == 0 {
            return Err(NormalizeError::Config(format!(
                "目标尺寸必须大于 0：{}x{}",
                target_width, target_height
            )));
        }
        let output_pixels = target_width as u64 * target_height as u64;
        if output_pixels > self.config.max_output_pixels {
            return Err(NormalizeError::ResourceLimit(format!(
                "目标尺寸过大：{}x{}（上限：{} 像素）",
                target_width, target_height, self.config.max_output_pixels
            )));
        }

        log::debug!("🔍 输入来源: {}", source.kind());
        let total_start = Instant::now();

        let load_start = Instant::now();
        let Some(raw) = self.load_source(source)? else {
            return Ok(None);
        };
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let decoded = self.decode(&raw)?;
        let original_size = decoded.dimensions();
        let rgb = flatten_onto_white(decoded);
        let decode_elapsed = decode_start.elapsed();

        let transform_start = Instant::now();
        let (resized, crop) = crop_and_resize(rgb, target_width, target_height)?;
        let transform_elapsed = transform_start.elapsed();

        let encode_start = Instant::now();
        let jpeg = encode_jpeg(&resized, self.config.jpeg_quality)?;
        let data_uri = to_data_uri(&jpeg);
        let encode_elapsed = encode_start.elapsed();

        log::info!(
            "✅ 图片规范化完成 - 来源: {} {}x{} -> {}x{} load={}ms decode={}ms transform={}ms encode={}ms total={}ms",
            raw.source_hint,
            original_size.0,
            original_size.1,
            target_width,
            target_height,
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            transform_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(Some(NormalizedImage {
            data_uri,
            width: target_width,
            height: target_height,
            original_size,
            crop,
        }))
    }

    /// 获取（必要时构建）阻塞式 HTTP 客户端。
    pub(super) fn http_client(&self) -> Result<&reqwest::blocking::Client, NormalizeError> {
        self.http_client.get_or_try_init(|| {
            reqwest::blocking::Client::builder()
                .timeout(self.config.fetch_timeout())
                .connect_timeout(self.config.connect_timeout())
                .build()
                .map_err(|e| NormalizeError::Network(format!("无法创建 HTTP 客户端：{}", e)))
        })
    }
}
