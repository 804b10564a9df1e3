//! JPEG 编码与 data URI 封装。

use base64::{Engine as _, engine::general_purpose};
use image::{ExtendedColorType, RgbImage};
use image::codecs::jpeg::JpegEncoder;

use super::NormalizeError;

pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// 以指定质量（1~100）编码为 JPEG。
pub(crate) fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, NormalizeError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| NormalizeError::Encode(format!("JPEG 编码失败：{}", e)))?;
    }

    Ok(buffer)
}

/// 将 JPEG 字节封装为 `data:image/jpeg;base64,...`。
pub(crate) fn to_data_uri(jpeg: &[u8]) -> String {
    let payload = general_purpose::STANDARD.encode(jpeg);
    let mut uri = String::with_capacity(JPEG_DATA_URI_PREFIX.len() + payload.len());
    uri.push_str(JPEG_DATA_URI_PREFIX);
    uri.push_str(&payload);
    uri
}
