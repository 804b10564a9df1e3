//! # 记录图片字段
//!
//! 项目、客户的创建/更新请求体，以及落库前对其图片字段的规范化。
//!
//! - 创建：图片缺失或为空时存空字符串，否则存规范化结果
//! - 更新：只处理请求中出现且非空的图片字段，缺失字段保持缺失（部分更新）

use serde::{Deserialize, Serialize};

use crate::image_normalizer::ImageNormalizer;

/// 创建场景下的图片字段：缺失或为空 → `""`，否则规范化。
pub fn normalize_image_field(normalizer: &ImageNormalizer, image: Option<&str>) -> String {
    match image {
        Some(data) if !data.is_empty() => normalizer.normalize(data),
        _ => String::new(),
    }
}

/// 创建请求中缺省的文本字段存为空字符串，显式 `null` 仍为 `None`。
fn empty_text() -> Option<String> {
    Some(String::new())
}

fn normalize_update_field(normalizer: &ImageNormalizer, image: Option<String>) -> Option<String> {
    image.map(|data| {
        if data.is_empty() {
            data
        } else {
            normalizer.normalize(&data)
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreate {
    pub project_name: String,
    #[serde(default)]
    pub project_image: Option<String>,
    #[serde(default = "empty_text")]
    pub description: Option<String>,
}

impl ProjectCreate {
    /// 返回图片字段已规范化的请求体。
    pub fn with_normalized_image(mut self, normalizer: &ImageNormalizer) -> Self {
        self.project_image = Some(normalize_image_field(
            normalizer,
            self.project_image.as_deref(),
        ));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectUpdate {
    pub fn with_normalized_image(mut self, normalizer: &ImageNormalizer) -> Self {
        self.project_image = normalize_update_field(normalizer, self.project_image.take());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCreate {
    pub client_name: String,
    #[serde(default)]
    pub client_image: Option<String>,
    #[serde(default = "empty_text")]
    pub description: Option<String>,
    #[serde(default = "empty_text")]
    pub designation: Option<String>,
}

impl ClientCreate {
    /// 返回图片字段已规范化的请求体。
    pub fn with_normalized_image(mut self, normalizer: &ImageNormalizer) -> Self {
        self.client_image = Some(normalize_image_field(
            normalizer,
            self.client_image.as_deref(),
        ));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
}

impl ClientUpdate {
    pub fn with_normalized_image(mut self, normalizer: &ImageNormalizer) -> Self {
        self.client_image = normalize_update_field(normalizer, self.client_image.take());
        self
    }
}
