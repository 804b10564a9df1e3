//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载规范化链路中的所有失败来源，避免字符串拼接式错误处理。
//! 该类型只在链路内部流转：对外的 `normalize` 永远返回字符串，失败时原样返回输入，
//! 仅 `try_normalize_to` 会把它交给调用方。

/// 图片规范化统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("变换错误：{0}")]
    Transform(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("配置错误：{0}")]
    Config(String),
}

impl NormalizeError {
    /// 稳定错误码，便于日志检索。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Decode(_) => "decode",
            Self::InvalidFormat(_) => "invalid_format",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Transform(_) => "transform",
            Self::Encode(_) => "encode",
            Self::Config(_) => "config",
        }
    }

    /// 错误所属的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Timeout(_) => "load",
            Self::Decode(_) | Self::InvalidFormat(_) | Self::ResourceLimit(_) => "decode",
            Self::Transform(_) => "transform",
            Self::Encode(_) => "encode",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_stage_follow_variant() {
        let err = NormalizeError::Timeout("下载超时（10秒）".to_string());
        assert_eq!(err.code(), "timeout");
        assert_eq!(err.stage(), "load");

        let err = NormalizeError::ResourceLimit("图片像素过大".to_string());
        assert_eq!(err.code(), "resource_limit");
        assert_eq!(err.stage(), "decode");
    }

    #[test]
    fn display_keeps_inner_message() {
        let err = NormalizeError::Encode("JPEG 编码失败".to_string());
        assert_eq!(err.to_string(), "编码错误：JPEG 编码失败");
    }
}
