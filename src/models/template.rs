// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A website template a business tenant can apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteTemplate {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(rename = "previewUrl")]
    pub preview_url: Option<String>,
}

/// The tenant's generated site, produced from an applied template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSite {
    pub id: String,
    #[serde(rename = "templateId")]
    pub template_id: String,
    pub domain: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
}

impl GeneratedSite {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    pub fn display_domain(&self) -> String {
        self.domain
            .clone()
            .unwrap_or_else(|| "not yet assigned".to_string())
    }
}
