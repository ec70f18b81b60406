//! Buyer services against a fake backend: addresses, promotions, wallet and
//! notifications.

#![allow(clippy::unwrap_used)]

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use marketplace_core::address::Address;
use marketplace_core::pagination::PageRequest;
use marketplace_core::{NotificationId, StoreId, Vnd};
use marketplace_integration_tests::{FakeBackend, ok, refused};
use marketplace_storefront::ApiError;
use marketplace_storefront::services::buyer::wallet::WithdrawalRequest;
use marketplace_storefront::services::notifications::Inbox;
use serde_json::json;

// =============================================================================
// Addresses
// =============================================================================

#[tokio::test]
async fn test_missing_address_book_is_empty() {
    let router = Router::new().route(
        "/api/v1/buyer/address",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"message": "Chưa có địa chỉ"}))) }),
    );
    let backend = FakeBackend::start(router).await.unwrap();

    assert!(backend.client().addresses().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_nested_address_is_listed() {
    let router = Router::new().route(
        "/api/v1/buyer/address",
        get(|| async {
            Json(ok(json!({"address": {
                "id": 4,
                "province": "Đà Nẵng",
                "ward": "Phường Hải Châu 1",
                "street": "12 Bạch Đằng",
                "phone": "0905123456",
                "default": true
            }})))
        }),
    );
    let backend = FakeBackend::start(router).await.unwrap();

    let addresses = backend.client().addresses().await.unwrap();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].home_address, "12 Bạch Đằng");
    assert!(addresses[0].is_default);
}

#[tokio::test]
async fn test_incomplete_address_is_not_sent() {
    let router = Router::new().route(
        "/api/v1/buyer/address",
        post(|| async { Json(ok(json!({"id": 1}))) }),
    );
    let backend = FakeBackend::start(router).await.unwrap();

    let address = Address {
        province: "Hà Nội".into(),
        phone: "123".into(),
        ..Address::default()
    };
    let err = backend.client().create_address(&address).await.unwrap_err();
    assert!(matches!(err, ApiError::Address(_)));
    assert_eq!(backend.log.count("/api/v1/buyer/address"), 0);
}

// =============================================================================
// Promotions
// =============================================================================

#[tokio::test]
async fn test_refused_promotion_listing_is_empty() {
    let router = Router::new().route(
        "/api/v1/buyer/promotions/store/{id}/available",
        get(|| async { Json(refused("Cửa hàng không tồn tại")) }),
    );
    let backend = FakeBackend::start(router).await.unwrap();

    let page = backend
        .client()
        .store_promotions(&StoreId::new("3"), Vnd::new(250_000), &PageRequest::new(0, 20))
        .await
        .unwrap();
    assert!(page.is_empty());

    let call = &backend.log.to("/api/v1/buyer/promotions/store/3/available")[0];
    assert!(call.query.as_deref().unwrap().contains("orderValue=250000"));
}

// =============================================================================
// Wallet
// =============================================================================

fn withdrawal(amount: i64) -> WithdrawalRequest {
    WithdrawalRequest {
        amount: Vnd::new(amount),
        bank_name: "Vietcombank".into(),
        bank_account_number: "0011001234567".into(),
        bank_account_name: "NGUYEN VAN MINH".into(),
        note: None,
    }
}

fn wallet() -> Router {
    Router::new()
        .route(
            "/api/v1/buyer/wallet/balance",
            get(|| async { Json(ok(json!({"balance": 300_000}))) }),
        )
        .route(
            "/api/v1/buyer/wallet/withdrawal-request",
            post(|| async { Json(ok(json!({"id": "w1", "status": "PENDING"}))) }),
        )
}

#[tokio::test]
async fn test_withdrawal_checks_live_balance() {
    let backend = FakeBackend::start(wallet()).await.unwrap();
    let client = backend.client();

    assert_eq!(client.wallet_balance().await.unwrap(), Vnd::new(300_000));

    let err = client.request_withdrawal(&withdrawal(500_000)).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(ref m) if m.starts_with("Số dư không đủ")));
    assert_eq!(backend.log.count("/api/v1/buyer/wallet/withdrawal-request"), 0);

    client.request_withdrawal(&withdrawal(200_000)).await.unwrap();
    assert_eq!(backend.log.count("/api/v1/buyer/wallet/withdrawal-request"), 1);
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notification_inboxes_use_their_own_paths() {
    let router = Router::new()
        .route(
            "/api/v1/b2c/stores/{id}/notifications/unread-count",
            get(|| async { Json(ok(json!({"unreadCount": 3}))) }),
        )
        .route(
            "/api/v1/buyer/notifications/{id}/read",
            put(|| async { Json(ok(json!(null))) }),
        )
        .route(
            "/api/v1/admin/notifications/mark-all-read",
            put(|| async { Json(ok(json!(null))) }),
        );
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();

    let store = Inbox::Store(StoreId::new("3"));
    assert_eq!(client.unread_notifications(&store).await.unwrap(), 3);
    client
        .mark_notification_read(&Inbox::Buyer, &NotificationId::new("n1"))
        .await
        .unwrap();
    client.mark_all_notifications_read(&Inbox::Admin).await.unwrap();

    let read = backend.log.to("/api/v1/buyer/notifications/n1/read");
    assert_eq!(read[0].method, "PUT");
    assert_eq!(backend.log.count("/api/v1/admin/notifications/mark-all-read"), 1);
}
