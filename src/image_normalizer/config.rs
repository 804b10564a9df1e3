//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有可调参数集中到 `NormalizerConfig`：目标尺寸、JPEG 质量、下载超时与资源上限。
//! `Default` 给出与业务记录一致的取值（450×350、质量 85、10 秒超时）。
//!
//! ## 实现思路
//!
//! - 通过 serde 支持从 JSON 等配置源加载，缺省字段回落到默认值。
//! - `validate` 在构建规范化器时调用一次，保证运行期参数总是合法。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::NormalizeError;

pub const DEFAULT_TARGET_WIDTH: u32 = 450;
pub const DEFAULT_TARGET_HEIGHT: u32 = 350;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 40_000_000;

/// 图片规范化配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// 输出宽度（像素）。
    pub target_width: u32,
    /// 输出高度（像素）。
    pub target_height: u32,
    /// JPEG 编码质量（1~100）。
    pub jpeg_quality: u8,
    /// URL 下载总超时（秒），网络请求只尝试一次。
    pub fetch_timeout_secs: u64,
    /// 建立连接（TCP/TLS）超时（秒）。
    pub connect_timeout_secs: u64,
    /// 编码后原始字节允许的最大体积（字节）。
    pub max_input_bytes: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 输出尺寸的像素上限，约束 `normalize_to` 传入的目标尺寸。
    pub max_output_pixels: u64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            fetch_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_input_bytes: 20 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
        }
    }
}

impl NormalizerConfig {
    /// 校验配置取值。
    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(NormalizeError::Config(format!(
                "目标尺寸必须大于 0：{}x{}",
                self.target_width, self.target_height
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(NormalizeError::Config(format!(
                "jpeg_quality 必须在 1~100 之间：{}",
                self.jpeg_quality
            )));
        }
        if self.fetch_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(NormalizeError::Config("超时时间必须大于 0 秒".to_string()));
        }
        if self.connect_timeout_secs > self.fetch_timeout_secs {
            return Err(NormalizeError::Config(
                "connect_timeout_secs 不能大于 fetch_timeout_secs".to_string(),
            ));
        }
        if self.max_input_bytes == 0 || self.max_decoded_pixels == 0 || self.max_output_pixels == 0
        {
            return Err(NormalizeError::Config("资源上限必须大于 0".to_string()));
        }
        let target_pixels = self.target_width as u64 * self.target_height as u64;
        if target_pixels > self.max_output_pixels {
            return Err(NormalizeError::Config(format!(
                "目标尺寸 {}x{} 超过输出像素上限 {}",
                self.target_width, self.target_height, self.max_output_pixels
            )));
        }

        Ok(())
    }

    pub(crate) fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
