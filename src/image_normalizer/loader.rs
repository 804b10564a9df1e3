//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（URL / data URI / 裸 Base64）的原始字节加载，并在解码前尽早校验。
//! 目标是尽快失败，减少不必要的内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - URL：阻塞式 HTTP 客户端，总超时由配置决定，只请求一次，不重试。
//!   先按 `Content-Length` 拒绝超限响应，再以 `take` 限长读取响应体。
//! - data URI：取第一个逗号之后的负载解码，格式错误视为失败。
//! - 裸 Base64：解码失败属于“软回退”，返回 `None` 让上层原样返回输入。
//! - 所有字节最终都要通过 magic bytes 签名校验。

use std::borrow::Cow;
use std::io::Read;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::source::{ImageSource, RawImageData};
use super::{ImageNormalizer, NormalizeError};

const BUFFER_INITIAL_CAPACITY: usize = 64 * 1024;

impl ImageNormalizer {
    /// 按来源加载原始字节。
    ///
    /// 返回 `Ok(None)` 表示输入不需要（或无法按图片）处理，应原样返回。
    pub(super) fn load_source(
        &self,
        source: ImageSource<'_>,
    ) -> Result<Option<RawImageData>, NormalizeError> {
        match source {
            ImageSource::Blank => Ok(None),
            ImageSource::Url(url) => self.load_from_url(url).map(Some),
            ImageSource::DataUri(data) => self.load_from_data_uri(data).map(Some),
            ImageSource::RawBase64(data) => self.load_from_raw_base64(data),
        }
    }

    /// 从 URL 加载图片原始字节。
    pub(super) fn load_from_url(&self, url: &str) -> Result<RawImageData, NormalizeError> {
        log::info!("🌐 开始下载图片 - URL: {}", Self::redact_url_for_log(url));

        let bytes = self.download_with_validation(url)?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "url",
        })
    }

    /// 从 data URI 加载图片原始字节。
    pub(super) fn load_from_data_uri(&self, data: &str) -> Result<RawImageData, NormalizeError> {
        log::debug!("📝 开始处理 data URI 图片");

        let payload = Self::data_uri_payload(data);
        let bytes = Self::decode_base64_with_limit(payload, self.config.max_input_bytes)?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes: Bytes::from(bytes),
            source_hint: "data-uri",
        })
    }

    /// 将整个输入按裸 Base64 解码。
    ///
    /// 解码失败或解码结果不是图片都不是错误：普通文本应原样透传。
    pub(super) fn load_from_raw_base64(
        &self,
        data: &str,
    ) -> Result<Option<RawImageData>, NormalizeError> {
        let bytes = match Self::decode_base64_with_limit(data, self.config.max_input_bytes) {
            Ok(bytes) => bytes,
            Err(NormalizeError::ResourceLimit(msg)) => {
                return Err(NormalizeError::ResourceLimit(msg));
            }
            Err(err) => {
                log::debug!("↩️ 输入不是有效的 Base64，原样返回：{}", err);
                return Ok(None);
            }
        };
        if let Err(err) = Self::validate_image_signature(&bytes) {
            log::debug!("↩️ Base64 解码结果不是图片，原样返回：{}", err);
            return Ok(None);
        }

        Ok(Some(RawImageData {
            bytes: Bytes::from(bytes),
            source_hint: "base64",
        }))
    }

    /// 执行带体积校验的单次下载。
    pub(super) fn download_with_validation(&self, url: &str) -> Result<Bytes, NormalizeError> {
        let client = self.http_client()?;
        let max_bytes = self.config.max_input_bytes;

        log::debug!("📡 发送 HTTP 请求...");
        let response = client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "image/avif,image/webp,image/apng,image/*,*/*;q=0.8",
            )
            .send()
            .map_err(|e| self.map_reqwest_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NormalizeError::Network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                Self::status_message(status.as_u16())
            )));
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
        {
            log::debug!("📄 响应类型: {}", content_type);
        }

        let declared_len = response.content_length();
        if let Some(size) = declared_len {
            if size > max_bytes {
                return Err(NormalizeError::ResourceLimit(Self::oversize_message(
                    "文件过大",
                    size,
                    max_bytes,
                )));
            }
        }

        let initial_capacity = declared_len
            .map(|len| len.min(max_bytes).min(usize::MAX as u64) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);

        response
            .take(max_bytes.saturating_add(1))
            .read_to_end(&mut buffer)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::TimedOut {
                    NormalizeError::Timeout(format!(
                        "下载数据流读取超时（{}秒）",
                        self.config.fetch_timeout_secs
                    ))
                } else {
                    NormalizeError::Network(format!(
                        "下载失败：{}",
                        Self::sanitize_error_message_with_redacted_url(&e.to_string(), url)
                    ))
                }
            })?;

        if buffer.len() as u64 > max_bytes {
            return Err(NormalizeError::ResourceLimit("下载后文件超过大小限制".to_string()));
        }

        log::debug!("✅ 下载完成 - {} bytes", buffer.len());

        Ok(Bytes::from(buffer))
    }

    /// 取 data URI 中第一个逗号之后的负载。
    ///
    /// 若负载中还有逗号，只保留到下一个逗号之前；没有逗号时整个字符串即为负载。
    pub(super) fn data_uri_payload(data: &str) -> &str {
        match data.split_once(',') {
            Some((_, rest)) => rest.split_once(',').map_or(rest, |(payload, _)| payload),
            None => data,
        }
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, NormalizeError> {
        let len = base64_data.len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| NormalizeError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| NormalizeError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 解码 Base64（标准字母表，忽略 ASCII 空白），解码前按长度估算体积上限。
    pub(super) fn decode_base64_with_limit(
        data: &str,
        max_bytes: u64,
    ) -> Result<Vec<u8>, NormalizeError> {
        let compact: Cow<'_, str> = if data.bytes().any(|b| b.is_ascii_whitespace()) {
            Cow::Owned(data.chars().filter(|c| !c.is_ascii_whitespace()).collect())
        } else {
            Cow::Borrowed(data)
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(&compact)?;
        if estimated_len > max_bytes {
            return Err(NormalizeError::ResourceLimit(Self::oversize_message(
                "Base64 预计解码体积过大",
                estimated_len,
                max_bytes,
            )));
        }

        general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| NormalizeError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    ///
    /// `infer` 识别为图片，或 `image` 能按内容猜出格式（PNM、QOI 等 `infer` 不认识的格式）即通过。
    pub(super) fn validate_image_signature(bytes: &[u8]) -> Result<(), NormalizeError> {
        if bytes.is_empty() {
            return Err(NormalizeError::InvalidFormat("图片内容为空".to_string()));
        }

        if infer::is_image(bytes) || image::guess_format(bytes).is_ok() {
            return Ok(());
        }

        match infer::get(bytes) {
            Some(kind) => Err(NormalizeError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            ))),
            None => Err(NormalizeError::InvalidFormat("无法识别图片类型".to_string())),
        }
    }

    /// 日志中只保留 scheme、主机、端口与路径，去掉查询参数与片段。
    pub(super) fn redact_url_for_log(url: &str) -> String {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        let host = parsed.host_str().unwrap_or("<unknown-host>");
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = parsed.path();

        format!("{}://{}{}{}", parsed.scheme(), host, port, path)
    }

    fn sanitize_error_message_with_redacted_url(error_msg: &str, url: &str) -> String {
        let redacted = Self::redact_url_for_log(url);
        error_msg.replace(url, &redacted)
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(&self, e: reqwest::Error, url: &str) -> NormalizeError {
        let err_msg = Self::sanitize_error_message_with_redacted_url(&e.to_string(), url);

        if e.is_timeout() {
            NormalizeError::Timeout(format!("下载超时（{}秒）", self.config.fetch_timeout_secs))
        } else if e.is_connect() {
            NormalizeError::Network(format!("无法连接：{}", err_msg))
        } else if e.is_builder() {
            NormalizeError::InvalidFormat(format!("URL 格式错误：{}", err_msg))
        } else {
            NormalizeError::Network(format!("请求失败：{}", err_msg))
        }
    }

    fn status_message(code: u16) -> &'static str {
        match code {
            404 => "未找到",
            403 => "访问被拒绝",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }

    fn oversize_message(label: &str, size: u64, limit: u64) -> String {
        format!(
            "{}：{:.2} MB（限制：{:.2} MB）",
            label,
            size as f64 / 1024.0 / 1024.0,
            limit as f64 / 1024.0 / 1024.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_normalizer::NormalizerConfig;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    const PNG_SIGNATURE: [u8; 12] = [137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];

    fn normalizer() -> ImageNormalizer {
        ImageNormalizer::new(NormalizerConfig::default()).expect("normalizer init failed")
    }

    /// 单次应答的本地 HTTP 服务，返回服务地址与线程句柄。
    fn serve_once(
        status_line: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");

            let mut req_buf = [0u8; 1024];
            let _ = stream.read(&mut req_buf);

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                content_type,
                body.len()
            );
            // 客户端可能在读完响应头后提前断开，写入失败不影响断言
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        });

        (format!("http://127.0.0.1:{}/image.png", addr.port()), server)
    }

    #[test]
    fn data_uri_payload_takes_segment_after_first_comma() {
        assert_eq!(ImageNormalizer::data_uri_payload("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(ImageNormalizer::data_uri_payload("data:image/png;base64,AAAA,BBBB"), "AAAA");
        assert_eq!(ImageNormalizer::data_uri_payload("data:image/png;base64,"), "");
        assert_eq!(ImageNormalizer::data_uri_payload("data:imageAAAA"), "data:imageAAAA");
    }

    #[test]
    fn decode_base64_ignores_line_breaks() {
        let decoded = ImageNormalizer::decode_base64_with_limit("SGVs\nbG8g\r\nd29y bGQ=", u64::MAX)
            .expect("wrapped base64 should decode");

        assert_eq!(decoded, b"Hello world");
    }

    #[test]
    fn decode_base64_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = ImageNormalizer::decode_base64_with_limit(&huge, 32);

        assert!(matches!(result, Err(NormalizeError::ResourceLimit(_))));
    }

    #[test]
    fn raw_base64_failure_is_soft_fallback() {
        let result = normalizer()
            .load_from_raw_base64("not-a-valid-base64-string!!")
            .expect("invalid base64 must not be an error");

        assert!(result.is_none());
    }

    #[test]
    fn raw_base64_text_that_is_not_an_image_is_soft_fallback() {
        for text in ["SGVsbG8=", "test", "abcd"] {
            let result = normalizer()
                .load_from_raw_base64(text)
                .expect("non-image base64 must not be an error");

            assert!(result.is_none(), "{} should pass through", text);
        }
    }

    #[test]
    fn data_uri_with_malformed_payload_is_decode_error() {
        let result = normalizer().load_from_data_uri("data:image/png;base64,@@@@");

        assert!(matches!(result, Err(NormalizeError::Decode(_))));
    }

    #[test]
    fn signature_check_accepts_png_and_rejects_html() {
        assert!(ImageNormalizer::validate_image_signature(&PNG_SIGNATURE).is_ok());
        assert!(matches!(
            ImageNormalizer::validate_image_signature(b"<html><body>nope</body></html>"),
            Err(NormalizeError::InvalidFormat(_))
        ));
        assert!(matches!(
            ImageNormalizer::validate_image_signature(&[]),
            Err(NormalizeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn signature_check_defers_to_image_format_guessing() {
        let ppm: &[u8] = b"P6\n1 1\n255\n\x00\x00\x00";
        let qoi: &[u8] = b"qoif\x00\x00\x00\x01\x00\x00\x00\x01\x03\x00";

        assert!(ImageNormalizer::validate_image_signature(ppm).is_ok());
        assert!(ImageNormalizer::validate_image_signature(qoi).is_ok());
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        let redacted = ImageNormalizer::redact_url_for_log(
            "https://example.com:8443/path/img.png?token=abc123#hash",
        );

        assert_eq!(redacted, "https://example.com:8443/path/img.png");
        assert_eq!(ImageNormalizer::redact_url_for_log("http://"), "<invalid-url>");
    }

    #[test]
    fn load_from_url_reads_image_body() {
        let (url, server) = serve_once("200 OK", "image/png", PNG_SIGNATURE.to_vec());

        let raw = normalizer().load_from_url(&url).expect("download should succeed");
        server.join().expect("server thread failed");

        assert_eq!(raw.source_hint, "url");
        assert_eq!(&raw.bytes[..], &PNG_SIGNATURE[..]);
    }

    #[test]
    fn load_from_url_rejects_error_status() {
        let (url, server) = serve_once("404 Not Found", "text/plain", b"missing".to_vec());

        let result = normalizer().load_from_url(&url);
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(NormalizeError::Network(_))));
    }

    #[test]
    fn load_from_url_rejects_non_image_body_even_when_content_type_is_image() {
        let (url, server) = serve_once("200 OK", "image/png", b"hello world".to_vec());

        let result = normalizer().load_from_url(&url);
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(NormalizeError::InvalidFormat(_))));
    }

    #[test]
    fn load_from_url_rejects_declared_oversize_body() {
        let config = NormalizerConfig {
            max_input_bytes: 4,
            ..NormalizerConfig::default()
        };
        let normalizer = ImageNormalizer::new(config).expect("normalizer init failed");
        let (url, server) = serve_once("200 OK", "image/png", PNG_SIGNATURE.to_vec());

        let result = normalizer.load_from_url(&url);
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(NormalizeError::ResourceLimit(_))));
    }

    #[test]
    fn load_from_url_reports_connection_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let port = listener.local_addr().expect("read local addr failed").port();
        drop(listener);

        let result = normalizer().load_from_url(&format!("http://127.0.0.1:{}/a.png", port));

        assert!(matches!(
            result,
            Err(NormalizeError::Network(_)) | Err(NormalizeError::Timeout(_))
        ));
    }
}
