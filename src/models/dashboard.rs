// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Role-shaped dashboard summary. The server fills the fields relevant
/// to the caller's role and omits the rest.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Dashboard {
    pub role: Option<String>,
    // Student
    #[serde(rename = "enrolledCourses")]
    pub enrolled_courses: Option<u32>,
    #[serde(rename = "completedLessons")]
    pub completed_lessons: Option<u32>,
    // Creator
    #[serde(rename = "publishedCourses")]
    pub published_courses: Option<u32>,
    #[serde(rename = "totalStudents")]
    pub total_students: Option<u64>,
    // Business
    #[serde(rename = "siteVisits")]
    pub site_visits: Option<u64>,
    #[serde(rename = "revenueCents")]
    pub revenue_cents: Option<i64>,
    // Admin
    #[serde(rename = "totalUsers")]
    pub total_users: Option<u64>,
    #[serde(rename = "pendingReviews")]
    pub pending_reviews: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_parses_partial_payload() {
        let json = r#"{"role": "creator", "publishedCourses": 4, "totalStudents": 210}"#;
        let dashboard: Dashboard = serde_json::from_str(json).expect("should parse");
        assert_eq!(dashboard.published_courses, Some(4));
        assert!(dashboard.site_visits.is_none());
    }
}
