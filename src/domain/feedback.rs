use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, OrderId};

pub type FeedbackId = Uuid;

/// Label used when feedback is not tied to a known order.
pub const GENERAL_FEEDBACK: &str = "General Feedback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommend {
    Yes,
    No,
}

impl Recommend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommend::Yes => "yes",
            Recommend::No => "no",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "yes" => Some(Recommend::Yes),
            "no" => Some(Recommend::No),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: FeedbackId,
    pub account_id: AccountId,
    pub order_id: Option<OrderId>,
    /// 1..=5
    pub rating: u8,
    pub comments: String,
    pub service_quality: Option<u8>,
    pub recommend: Recommend,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(account_id: AccountId, rating: u8, comments: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            order_id: None,
            rating,
            comments,
            service_quality: None,
            recommend: Recommend::Yes,
            created_at: Utc::now(),
        }
    }

    pub fn with_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_service_quality(mut self, quality: u8) -> Self {
        self.service_quality = Some(quality);
        self
    }

    pub fn with_recommend(mut self, recommend: Recommend) -> Self {
        self.recommend = recommend;
        self
    }
}

pub fn rating_in_range(value: i64) -> bool {
    (1..=5).contains(&value)
}
