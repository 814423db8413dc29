use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountId, Feedback, GENERAL_FEEDBACK, Recommend, rating_in_range};
use crate::storage::Repository;

use super::{AppError, Validator};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub order_id: Option<String>,
    pub rating: Option<i64>,
    pub comments: String,
    pub service_quality: Option<i64>,
    pub recommend: Option<String>,
}

/// Feedback together with a human label for the order it refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub order_details: String,
}

#[derive(Clone)]
pub struct FeedbackService {
    repo: Repository,
}

impl FeedbackService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn submit(
        &self,
        account_id: AccountId,
        request: FeedbackRequest,
    ) -> Result<Feedback, AppError> {
        let mut v = Validator::new();
        let rating = v.require(
            request.rating.filter(|r| rating_in_range(*r)),
            "rating",
            "Rating must be between 1 and 5",
        );
        v.check(
            !request.comments.trim().is_empty(),
            "comments",
            "Comments are required",
        );
        if let Some(quality) = request.service_quality {
            v.check(
                rating_in_range(quality),
                "serviceQuality",
                "Service quality must be between 1 and 5",
            );
        }
        let recommend = match request.recommend.as_deref() {
            None | Some("") => Some(Recommend::Yes),
            Some(s) => v.require(
                Recommend::from_str(s),
                "recommend",
                "Recommend must be yes or no",
            ),
        };
        let order_id = match request.order_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => v.require(Uuid::parse_str(s).ok(), "orderId", "Invalid order reference"),
        };
        let (rating, recommend) = v.finish_with(rating.zip(recommend))?;

        // Ratings were range-checked above
        let mut feedback = Feedback::new(
            account_id,
            rating as u8,
            request.comments.trim().to_string(),
        )
        .with_recommend(recommend);
        if let Some(order_id) = order_id {
            feedback = feedback.with_order(order_id);
        }
        if let Some(quality) = request.service_quality {
            feedback = feedback.with_service_quality(quality as u8);
        }

        self.repo.save_feedback(&feedback).await?;
        Ok(feedback)
    }

    /// All feedback of an account, newest first, with order labels.
    pub async fn list(&self, account_id: AccountId) -> Result<Vec<FeedbackView>, AppError> {
        let feedbacks = self.repo.list_feedback(account_id).await?;
        let mut views = Vec::with_capacity(feedbacks.len());

        for feedback in feedbacks {
            let order = match feedback.order_id {
                Some(order_id) => self.repo.get_order(order_id).await?,
                None => None,
            };
            let order_details = order
                .filter(|o| o.account_id == account_id)
                .map(|o| o.short_label())
                .unwrap_or_else(|| GENERAL_FEEDBACK.to_string());
            views.push(FeedbackView {
                feedback,
                order_details,
            });
        }

        Ok(views)
    }
}
