//! # 解码与变换流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGB → 裁剪 → 缩放”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先读取 header 尺寸做像素检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸，按像素上限快速拒绝
//! 2. 完整解码
//! 3. 带透明通道的图像合成到白色背景，其余模式直接转 RGB
//! 4. 按目标宽高比居中裁剪（比例比较使用整数交叉相乘）
//! 5. Lanczos3 缩放到目标尺寸，`fast_image_resize` 失败时回退 `image::imageops`

use std::io::Cursor;

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};

use super::source::{CropRect, RawImageData};
use super::{ImageNormalizer, NormalizeError};

impl ImageNormalizer {
    /// 将原始字节解码为图像。
    pub(super) fn decode(&self, raw: &RawImageData) -> Result<DynamicImage, NormalizeError> {
        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        self.validate_pixel_limits(header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| NormalizeError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        self.validate_pixel_limits(width, height)?;

        log::debug!(
            "🖼️ 图片解码成功 - 来源: {} 尺寸: {}x{} 颜色: {:?}",
            raw.source_hint,
            width,
            height,
            decoded.color()
        );

        Ok(decoded)
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), NormalizeError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| NormalizeError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| NormalizeError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), NormalizeError> {
        if width == 0 || height == 0 {
            return Err(NormalizeError::Decode(format!(
                "图片尺寸无效：{}x{}",
                width, height
            )));
        }

        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| NormalizeError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > self.config.max_decoded_pixels {
            return Err(NormalizeError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.config.max_decoded_pixels
            )));
        }

        Ok(())
    }
}

/// 转为不透明 RGB。
///
/// 带透明通道的图像（RGBA、灰度+Alpha、带透明色的调色板图）按自身 alpha
/// 合成到白色背景上；其余模式直接转换。
pub(crate) fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }

    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        dst.0 = [
            blend_over_white(r, a),
            blend_over_white(g, a),
            blend_over_white(b, a),
        ];
    }

    rgb
}

fn blend_over_white(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (channel as u32, alpha as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// 计算把 `original` 居中裁剪到 `target` 宽高比所需的区域。
///
/// 原图更宽时只裁宽度，更高时只裁高度，比例相同则不裁剪。
/// 新边长取四舍五入，偏移量向下取整，因此两侧裁掉的像素最多相差 1。
/// 任一尺寸为 0 时返回整张原图。
pub fn center_crop_rect(
    original_width: u32,
    original_height: u32,
    target_width: u32,
    target_height: u32,
) -> CropRect {
    let full = CropRect {
        x: 0,
        y: 0,
        width: original_width,
        height: original_height,
    };
    if original_width == 0 || original_height == 0 || target_width == 0 || target_height == 0 {
        return full;
    }

    // 四舍五入的中间值会超出 u64，统一在 u128 中计算
    let (ow, oh) = (original_width as u128, original_height as u128);
    let (tw, th) = (target_width as u128, target_height as u128);

    match (ow * th).cmp(&(oh * tw)) {
        std::cmp::Ordering::Greater => {
            let new_width = ((2 * oh * tw + th) / (2 * th)).clamp(1, ow) as u32;
            CropRect {
                x: (original_width - new_width) / 2,
                y: 0,
                width: new_width,
                height: original_height,
            }
        }
        std::cmp::Ordering::Less => {
            let new_height = ((2 * ow * th + tw) / (2 * tw)).clamp(1, oh) as u32;
            CropRect {
                x: 0,
                y: (original_height - new_height) / 2,
                width: original_width,
                height: new_height,
            }
        }
        std::cmp::Ordering::Equal => full,
    }
}

/// 居中裁剪并缩放到精确的目标尺寸。
pub(crate) fn crop_and_resize(
    image: RgbImage,
    target_width: u32,
    target_height: u32,
) -> Result<(RgbImage, CropRect), NormalizeError> {
    if target_width == 0 || target_height == 0 {
        return Err(NormalizeError::Config(format!(
            "目标尺寸必须大于 0：{}x{}",
            target_width, target_height
        )));
    }

    let (width, height) = image.dimensions();
    let rect = center_crop_rect(width, height, target_width, target_height);

    let cropped = if rect.width == width && rect.height == height {
        image
    } else {
        image::imageops::crop_imm(&image, rect.x, rect.y, rect.width, rect.height).to_image()
    };

    if cropped.dimensions() == (target_width, target_height) {
        return Ok((cropped, rect));
    }

    let resized = match resize_with_fast_image_resize(&cropped, target_width, target_height) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!(
                "⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}",
                err
            );
            image::imageops::resize(&cropped, target_width, target_height, FilterType::Lanczos3)
        }
    };

    Ok((resized, rect))
}

fn resize_with_fast_image_resize(
    image: &RgbImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbImage, NormalizeError> {
    let (src_width, src_height) = image.dimensions();

    let src_image = fr::images::ImageRef::new(
        src_width,
        src_height,
        image.as_raw(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| NormalizeError::Transform(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| NormalizeError::Transform(format!("fast_image_resize 执行失败：{}", e)))?;

    RgbImage::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| NormalizeError::Transform("fast_image_resize 输出缓冲长度异常".to_string()))
}
