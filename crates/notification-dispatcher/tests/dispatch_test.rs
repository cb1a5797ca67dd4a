//! 单目标通知集成测试

mod common;

use common::{Harness, announcement, user};
use market_shared::models::{AnnouncementType, NotificationChannel, UserRole};
use notification_dispatcher::{DispatchEvent, NotificationError, OrderStatus};

fn harness_with_buyer(phone: Option<&str>) -> Harness {
    let harness = Harness::new();
    harness
        .store
        .add_user(user("buyer-1", UserRole::Buyer, true, phone));
    harness
}

#[tokio::test]
async fn test_store_failure_rejects_and_skips_send() {
    let harness = harness_with_buyer(Some("0712345678"));
    harness.store.fail_inserts_for("buyer-1");

    let err = harness
        .dispatcher()
        .dispatch(
            "buyer-1",
            Some("seller-1".to_string()),
            Some("42".to_string()),
            NotificationChannel::Email,
            "Order Shipped",
            "Your parcel left the warehouse",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NotificationError::Persistence(_)));
    assert!(harness.log.events().is_empty());
}

#[tokio::test]
async fn test_email_sender_error_still_resolves() {
    let harness = harness_with_buyer(None);
    harness.email.break_for("buyer-1@example.com");

    let notification = harness
        .dispatcher()
        .dispatch(
            "buyer-1",
            Some("seller-1".to_string()),
            Some("42".to_string()),
            NotificationChannel::Email,
            "Order Shipped",
            "Your parcel left the warehouse",
        )
        .await
        .unwrap();

    assert_eq!(notification.channel, NotificationChannel::Email);
    assert_eq!(notification.order_id.as_deref(), Some("42"));
    assert!(notification.sent_at.is_some());
    assert_eq!(harness.email.sent_to(), vec!["buyer-1@example.com".to_string()]);
    assert_eq!(harness.store.notifications_for("buyer-1"), vec![notification]);
}

#[tokio::test]
async fn test_rejected_email_still_resolves() {
    let harness = harness_with_buyer(None);
    harness.email.reject("buyer-1@example.com");

    let result = harness
        .dispatcher()
        .dispatch("buyer-1", None, None, NotificationChannel::Email, "Hello", "Hi")
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_legacy_title_selects_order_template() {
    let harness = harness_with_buyer(None);

    harness
        .dispatcher()
        .dispatch(
            "buyer-1",
            None,
            Some("42".to_string()),
            NotificationChannel::Email,
            "Order Delivered",
            "Enjoy!",
        )
        .await
        .unwrap();

    assert_eq!(harness.email.subjects(), vec!["Order #42 Delivered".to_string()]);
}

#[tokio::test]
async fn test_unknown_title_uses_generic_template() {
    let harness = harness_with_buyer(None);

    harness
        .dispatcher()
        .dispatch(
            "buyer-1",
            None,
            None,
            NotificationChannel::Email,
            "📢 New Announcement: Market closed",
            "Closed on Friday",
        )
        .await
        .unwrap();

    assert_eq!(
        harness.email.subjects(),
        vec!["📢 New Announcement: Market closed".to_string()]
    );
}

#[tokio::test]
async fn test_announcement_event_renders_by_id() {
    let harness = harness_with_buyer(None);
    let ann = announcement("ann-9", AnnouncementType::ProductLaunch);
    harness.store.add_announcement(ann.clone());

    let notification = harness
        .dispatcher()
        .dispatch_event(
            "buyer-1",
            &DispatchEvent::announcement(&ann),
            NotificationChannel::Email,
        )
        .await
        .unwrap();

    assert_eq!(notification.sender_id.as_deref(), Some(common::AUTHOR_ID));
    assert_eq!(
        harness.email.subjects(),
        vec!["🚀 New Product: Market update".to_string()]
    );
}

#[tokio::test]
async fn test_sms_dispatch_normalizes_phone() {
    let harness = harness_with_buyer(Some("254712345678"));
    let event = DispatchEvent::order_status("42", OrderStatus::Shipped, None);

    harness
        .dispatcher()
        .dispatch_event("buyer-1", &event, NotificationChannel::Sms)
        .await
        .unwrap();

    assert_eq!(harness.sms.sent_to(), vec!["+254712345678".to_string()]);
    assert_eq!(
        harness.sms.messages(),
        vec!["Order #42 Shipped: Your order #42 is on its way.".to_string()]
    );
}

#[tokio::test]
async fn test_invalid_phone_never_reaches_sms_sender() {
    let harness = harness_with_buyer(Some("12345"));

    let notification = harness
        .dispatcher()
        .dispatch("buyer-1", None, None, NotificationChannel::Sms, "Hello", "Hi")
        .await
        .unwrap();

    assert_eq!(notification.channel, NotificationChannel::Sms);
    assert!(harness.sms.sent_to().is_empty());
}

#[tokio::test]
async fn test_in_app_only_records() {
    let harness = harness_with_buyer(Some("0712345678"));

    harness
        .dispatcher()
        .dispatch("buyer-1", None, None, NotificationChannel::InApp, "Hello", "Hi")
        .await
        .unwrap();

    assert_eq!(harness.store.count_by_channel(NotificationChannel::InApp), 1);
    assert!(harness.log.events().is_empty());
}

#[tokio::test]
async fn test_unknown_receiver_is_rejected_without_record() {
    let harness = Harness::new();

    let err = harness
        .dispatcher()
        .dispatch("ghost", None, None, NotificationChannel::Email, "Hello", "Hi")
        .await
        .unwrap_err();

    assert!(err.is_precondition());
    assert!(harness.store.notifications().is_empty());
}
