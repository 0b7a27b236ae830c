// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_cents;

/// A subscription plan offered on the pricing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(rename = "priceCents")]
    pub price_cents: i64,
    /// Billing interval: "month" or "year".
    pub interval: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Plan {
    pub fn display_price(&self) -> String {
        format!("{}/{}", format_cents(self.price_cents), self.interval)
    }
}

/// The caller's current subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(rename = "planId")]
    pub plan_id: String,
    /// "active", "past_due", or "canceled".
    pub status: String,
    #[serde(rename = "currentPeriodEnd")]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_display_price() {
        let plan = Plan {
            id: "p_1".to_string(),
            name: "Business".to_string(),
            price_cents: 9900,
            interval: "month".to_string(),
            features: vec!["Site builder".to_string()],
        };
        assert_eq!(plan.display_price(), "$99.00/month");
    }

    #[test]
    fn test_subscription_parses_and_reports_active() {
        let json = r#"{
            "id": "s_1",
            "planId": "p_1",
            "status": "active",
            "currentPeriodEnd": "2026-09-01T00:00:00Z"
        }"#;
        let sub: Subscription = serde_json::from_str(json).expect("should parse");
        assert!(sub.is_active());

        let canceled = Subscription {
            status: "canceled".to_string(),
            ..sub
        };
        assert!(!canceled.is_active());
    }
}
