// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_cents;

/// A catalog listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "authorName")]
    pub author_name: Option<String>,
    #[serde(rename = "priceCents")]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub published: bool,
    #[serde(rename = "coverUrl")]
    pub cover_url: Option<String>,
    #[serde(rename = "enrolledCount")]
    pub enrolled_count: Option<u64>,
}

impl CourseSummary {
    pub fn display_price(&self) -> String {
        match self.price_cents {
            Some(0) | None => "Free".to_string(),
            Some(cents) => format_cents(cents),
        }
    }
}

/// Full course detail, including the lesson outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "authorName")]
    pub author_name: Option<String>,
    #[serde(rename = "priceCents")]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub preview: bool,
}

impl Lesson {
    pub fn display_duration(&self) -> String {
        match self.duration_seconds {
            Some(secs) => format!("{}:{:02}", secs / 60, secs % 60),
            None => "--:--".to_string(),
        }
    }
}

/// Payload for creating a new course draft.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "priceCents")]
    pub price_cents: Option<i64>,
}

/// Server-issued ticket for uploading course media. The client PUTs the
/// file to `upload_url` directly; this crate only handles the metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadTicket {
    #[serde(rename = "assetId")]
    pub asset_id: String,
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

impl UploadTicket {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_summary_display_price() {
        let mut summary = CourseSummary {
            id: "c_1".to_string(),
            title: "Rust for Educators".to_string(),
            author_name: None,
            price_cents: Some(2499),
            published: true,
            cover_url: None,
            enrolled_count: None,
        };
        assert_eq!(summary.display_price(), "$24.99");

        summary.price_cents = Some(0);
        assert_eq!(summary.display_price(), "Free");

        summary.price_cents = None;
        assert_eq!(summary.display_price(), "Free");
    }

    #[test]
    fn test_course_parses_wire_format() {
        let json = r#"{
            "id": "c_7",
            "title": "Intro to Piano",
            "description": "Twelve lessons",
            "authorName": "Glenn",
            "priceCents": 4900,
            "published": true,
            "lessons": [
                {"id": "l_1", "title": "Posture", "durationSeconds": 340, "preview": true}
            ],
            "updatedAt": "2026-07-01T12:00:00Z"
        }"#;

        let course: Course = serde_json::from_str(json).expect("should parse");
        assert_eq!(course.lessons.len(), 1);
        assert_eq!(course.lessons[0].display_duration(), "5:40");
        assert!(course.updated_at.is_some());
    }

    #[test]
    fn test_upload_ticket_expiry() {
        let json = r#"{
            "assetId": "a_1",
            "uploadUrl": "https://uploads.skillbridge.io/a_1",
            "expiresAt": "2000-01-01T00:00:00Z"
        }"#;
        let ticket: UploadTicket = serde_json::from_str(json).expect("should parse");
        assert!(ticket.is_expired());
    }
}
