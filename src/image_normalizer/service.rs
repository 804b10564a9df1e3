//! # 服务层
//!
//! ## 设计思路
//!
//! 记录创建/更新处理器只需要“传入字符串、拿回字符串”，因此这里提供：
//! - 进程级默认规范化器（懒加载，默认配置）与对应的自由函数
//! - 异步包装：在 tokio 阻塞线程池上执行，避免下载与解码阻塞异步调度线程
//!
//! ## 实现思路
//!
//! 异步包装与同步入口保持同一契约：阻塞任务本身失败（panic / 运行时关闭）时同样原样返回输入。

use once_cell::sync::Lazy;

use super::{ImageNormalizer, NormalizerConfig};

static DEFAULT_NORMALIZER: Lazy<ImageNormalizer> =
    Lazy::new(|| ImageNormalizer::from_valid_config(NormalizerConfig::default()));

/// 进程级默认规范化器（450×350、质量 85、10 秒下载超时）。
pub fn default_normalizer() -> &'static ImageNormalizer {
    &DEFAULT_NORMALIZER
}

/// 使用默认配置规范化为 450×350 的 JPEG data URI，失败时原样返回。
///
/// # 示例
/// ```rust
/// use project_image_normalizer::normalize;
///
/// assert_eq!(normalize(""), "");
/// assert_eq!(normalize("not-a-valid-base64-string!!"), "not-a-valid-base64-string!!");
/// ```
pub fn normalize(input: &str) -> String {
    DEFAULT_NORMALIZER.normalize(input)
}

/// 使用默认配置规范化到指定尺寸，失败时原样返回。
pub fn normalize_to(input: &str, target_width: u32, target_height: u32) -> String {
    DEFAULT_NORMALIZER.normalize_to(input, target_width, target_height)
}

/// `normalize` 的异步版本，在阻塞线程池上执行。
pub async fn normalize_async(input: String) -> String {
    DEFAULT_NORMALIZER.normalize_async(input).await
}

impl ImageNormalizer {
    /// 在 tokio 阻塞线程池上执行 `normalize`。
    ///
    /// 必须在 tokio 运行时内调用。
    pub async fn normalize_async(&self, input: String) -> String {
        let normalizer = self.clone();
        let fallback = input.clone();

        match tokio::task::spawn_blocking(move || normalizer.normalize(&input)).await {
            Ok(output) => output,
            Err(err) => {
                log::warn!("⚠️ 图片规范化任务执行失败，原样返回输入：{}", err);
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn create_data_uri(width: u32, height: u32) -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 120, 200])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(cursor.into_inner())
        )
    }

    #[test]
    fn default_normalizer_uses_default_config() {
        assert_eq!(default_normalizer().config(), &NormalizerConfig::default());
    }

    #[test]
    fn free_functions_delegate_to_default_normalizer() {
        let input = create_data_uri(40, 40);

        assert!(normalize(&input).starts_with("data:image/jpeg;base64,"));
        assert_eq!(normalize_to("", 10, 10), "");
    }

    #[tokio::test]
    async fn async_wrapper_matches_sync_contract() {
        let input = create_data_uri(64, 32);

        let output = normalize_async(input).await;
        assert!(output.starts_with("data:image/jpeg;base64,"));

        let passthrough = normalize_async("%%%".to_string()).await;
        assert_eq!(passthrough, "%%%");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_are_independent() {
        let normalizer =
            ImageNormalizer::new(NormalizerConfig::default()).expect("normalizer init failed");
        let inputs: Vec<String> = [(30, 90), (90, 30), (45, 35)]
            .into_iter()
            .map(|(w, h)| create_data_uri(w, h))
            .collect();

        let tasks: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let normalizer = normalizer.clone();
                tokio::spawn(async move { normalizer.normalize_async(input).await })
            })
            .collect();

        for task in tasks {
            let output = task.await.expect("task should not panic");
            assert!(output.starts_with("data:image/jpeg;base64,"));
        }
    }
}
