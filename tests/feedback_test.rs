mod common;

use std::time::Duration;

use anyhow::Result;
use freshclean::application::{AppError, FeedbackRequest};
use freshclean::domain::{GENERAL_FEEDBACK, Recommend};
use uuid::Uuid;

use common::{order_request, signup, test_service};

fn feedback(rating: i64, comments: &str) -> FeedbackRequest {
    FeedbackRequest {
        rating: Some(rating),
        comments: comments.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_submit_and_list_with_order_label() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (account, _) = signup(&service, "asha@example.com").await?;
    let placed = service
        .orders()
        .place_order(account.id, order_request("dry-clean", 1.0, false, "card"))
        .await?;

    let submitted = service
        .feedback()
        .submit(
            account.id,
            FeedbackRequest {
                order_id: Some(placed.order.id.to_string()),
                service_quality: Some(4),
                recommend: Some("no".into()),
                ..feedback(5, "Crisp shirts")
            },
        )
        .await?;
    assert_eq!(submitted.rating, 5);
    assert_eq!(submitted.service_quality, Some(4));
    assert_eq!(submitted.recommend, Recommend::No);

    tokio::time::sleep(Duration::from_millis(5)).await;
    service
        .feedback()
        .submit(account.id, feedback(3, "Late pickup"))
        .await?;

    let views = service.feedback().list(account.id).await?;
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].feedback.comments, "Late pickup");
    assert_eq!(views[0].order_details, GENERAL_FEEDBACK);

    let simple = placed.order.id.simple().to_string();
    let expected = format!("Order #{} - Dry Cleaning", &simple[simple.len() - 6..]);
    assert_eq!(views[1].order_details, expected);

    Ok(())
}

#[tokio::test]
async fn test_unknown_order_is_general_feedback() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (account, _) = signup(&service, "asha@example.com").await?;

    service
        .feedback()
        .submit(
            account.id,
            FeedbackRequest {
                order_id: Some(Uuid::new_v4().to_string()),
                ..feedback(4, "Good")
            },
        )
        .await?;

    let views = service.feedback().list(account.id).await?;
    assert_eq!(views[0].order_details, GENERAL_FEEDBACK);
    assert_eq!(views[0].feedback.recommend, Recommend::Yes);

    Ok(())
}

#[tokio::test]
async fn test_feedback_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (account, _) = signup(&service, "asha@example.com").await?;

    let err = service
        .feedback()
        .submit(
            account.id,
            FeedbackRequest {
                order_id: Some("not-an-id".into()),
                service_quality: Some(9),
                recommend: Some("maybe".into()),
                ..feedback(6, "   ")
            },
        )
        .await
        .unwrap_err();

    match err {
        AppError::Validation(errors) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(
                fields,
                vec!["rating", "comments", "serviceQuality", "recommend", "orderId"]
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(service.feedback().list(account.id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_feedback_is_per_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (first, _) = signup(&service, "first@example.com").await?;
    let (second, _) = signup(&service, "second@example.com").await?;

    service
        .feedback()
        .submit(first.id, feedback(5, "Great"))
        .await?;

    assert_eq!(service.feedback().list(first.id).await?.len(), 1);
    assert!(service.feedback().list(second.id).await?.is_empty());

    Ok(())
}
