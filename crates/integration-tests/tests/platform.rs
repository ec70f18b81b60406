//! Platform administration: shipper accounts, money and dispute rulings.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::Multipart;
use axum::routing::{get, post, put};
use chrono::NaiveDate;
use marketplace_core::pagination::PageRequest;
use marketplace_core::{DisputeId, RefundRequestId, Vnd, WithdrawalId};
use marketplace_integration_tests::{FakeBackend, ok};
use marketplace_storefront::ApiError;
use marketplace_storefront::services::admin::disputes::{ItemValue, QualityResolution, QualityRuling, ReturnRuling};
use marketplace_storefront::services::admin::finance::{RefundAction, RefundDecision};
use marketplace_storefront::services::admin::shippers::ShipperAccount;
use marketplace_storefront::services::auth::Upload;
use marketplace_storefront::services::seller::wallet::WithdrawalQuery;
use secrecy::SecretString;
use serde_json::{Value, json};

/// JSON bodies seen by one route.
#[derive(Clone, Default)]
struct Bodies(Arc<Mutex<Vec<Value>>>);

impl Bodies {
    fn push(&self, body: Value) {
        self.0.lock().unwrap().push(body);
    }

    fn last(&self) -> Value {
        self.0.lock().unwrap().last().cloned().unwrap()
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

fn capture_put(bodies: &Bodies, reply: Value) -> axum::routing::MethodRouter {
    let bodies = bodies.clone();
    put(move |Json(body): Json<Value>| {
        let bodies = bodies.clone();
        let reply = reply.clone();
        async move {
            bodies.push(body);
            Json(ok(reply))
        }
    })
}

// =============================================================================
// Shippers
// =============================================================================

fn account(retype: &str) -> ShipperAccount {
    ShipperAccount {
        full_name: " Trần Văn An ".into(),
        email: "an.tran@ship.vn".into(),
        password: SecretString::from("Giao-hang-1".to_owned()),
        retype_password: SecretString::from(retype.to_owned()),
        date_of_birth: NaiveDate::from_ymd_opt(1998, 3, 9).unwrap(),
        phone: Some("0912345678".into()),
    }
}

#[tokio::test]
async fn test_shipper_account_is_created_with_avatar() {
    let fields: Arc<Mutex<Vec<(String, Vec<u8>)>>> = Arc::default();
    let router = {
        let fields = fields.clone();
        Router::new().route(
            "/api/v1/admin/shipper",
            post(move |mut multipart: Multipart| {
                let fields = fields.clone();
                async move {
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_owned();
                        let bytes = field.bytes().await.unwrap().to_vec();
                        fields.lock().unwrap().push((name, bytes));
                    }
                    Json(ok(json!({"id": 4, "fullName": "Trần Văn An", "active": true})))
                }
            }),
        )
    };
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();

    let err = client
        .create_shipper(&account("khac"), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Mật khẩu xác nhận không khớp");
    assert!(backend.log.all().is_empty());

    let avatar = Upload::image("an.png", vec![0x89, b'P', b'N', b'G']);
    let shipper = client
        .create_shipper(&account("Giao-hang-1"), Some(avatar))
        .await
        .unwrap();
    assert_eq!(shipper.full_name.as_deref(), Some("Trần Văn An"));

    let fields = fields.lock().unwrap();
    let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["dto", "avatar"]);
    let dto: Value = serde_json::from_slice(&fields[0].1).unwrap();
    assert_eq!(
        dto,
        json!({
            "email": "an.tran@ship.vn",
            "password": "Giao-hang-1",
            "fullName": "Trần Văn An",
            "dateOfBirth": "1998-03-09",
            "phone": "0912345678"
        })
    );
}

// =============================================================================
// Withdrawals & refunds
// =============================================================================

#[tokio::test]
async fn test_admin_withdrawal_pages_start_at_one() {
    let bodies = Bodies::default();
    let router = Router::new()
        .route(
            "/api/v1/admin/withdrawals",
            get(|| async {
                Json(ok(json!({"content": [{"id": 31, "amount": 300_000, "status": "PENDING",
                                            "bankAccountNumber": "0071000123456"}],
                               "totalElements": 1})))
            }),
        )
        .route(
            "/api/v1/admin/withdrawals/{id}/reject",
            capture_put(&bodies, json!({"id": 31, "status": "REJECTED"})),
        );
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();

    let query = WithdrawalQuery {
        page: PageRequest::new(0, 20),
        status: Some("PENDING".into()),
    };
    let page = client.admin_withdrawals(&query).await.unwrap();
    assert_eq!(page.content[0].bank_account.as_deref(), Some("0071000123456"));
    let sent = backend.log.to("/api/v1/admin/withdrawals");
    let sent = sent[0].query.as_deref().unwrap();
    assert!(sent.contains("page=1"));
    assert!(sent.contains("status=PENDING"));

    let id = WithdrawalId::new("31");
    assert!(matches!(
        client.reject_withdrawal(&id, "   ").await,
        Err(ApiError::Validation(_))
    ));
    assert_eq!(bodies.len(), 0);

    let rejected = client
        .reject_withdrawal(&id, " Sai số tài khoản ")
        .await
        .unwrap();
    assert_eq!(rejected.status.as_deref(), Some("REJECTED"));
    assert_eq!(bodies.last(), json!({"reason": "Sai số tài khoản"}));
}

#[tokio::test]
async fn test_refund_rejection_requires_reason() {
    let bodies = Bodies::default();
    let router = {
        let bodies = bodies.clone();
        Router::new().route(
            "/api/v1/admin/refunds/process",
            post(move |Json(body): Json<Value>| {
                let bodies = bodies.clone();
                async move {
                    bodies.push(body);
                    Json(ok(json!({"id": 2, "refundAmount": 150_000, "status": "COMPLETED"})))
                }
            }),
        )
    };
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();

    let mut decision = RefundDecision {
        refund_request_id: RefundRequestId::new("2"),
        action: RefundAction::Reject,
        refund_transaction_id: None,
        admin_note: None,
        rejection_reason: None,
    };
    let err = client.process_refund(&decision).await.unwrap_err();
    assert_eq!(err.to_string(), "Lý do từ chối hoàn tiền là bắt buộc");
    assert!(backend.log.all().is_empty());

    decision.action = RefundAction::Approve;
    decision.refund_transaction_id = Some("VNP14012345".into());
    let refund = client.process_refund(&decision).await.unwrap();
    assert_eq!(refund.amount, Vnd::new(150_000));
    assert_eq!(
        bodies.last(),
        json!({
            "refundRequestId": "2",
            "action": "APPROVE",
            "refundTransactionId": "VNP14012345",
            "adminNote": null,
            "rejectionReason": null
        })
    );
}

// =============================================================================
// Disputes
// =============================================================================

fn quality(decision: QualityRuling, partial: Option<i64>) -> QualityResolution {
    QualityResolution {
        decision,
        reason: "Ảnh chụp cho thấy hàng bị đổi".into(),
        partial_refund_amount: partial.map(Vnd::new),
        item: Some(ItemValue {
            product_price: Vnd::new(500_000),
            store_discount: Vnd::new(50_000),
            platform_commission: Vnd::new(25_000),
        }),
        had_return_request: true,
    }
}

#[tokio::test]
async fn test_quality_rulings_carry_refund_and_warning() {
    let bodies = Bodies::default();
    let router = Router::new().route(
        "/api/v1/admin/disputes/{id}/resolve-quality",
        capture_put(&bodies, json!({"id": 8, "status": "RESOLVED"})),
    );
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let id = DisputeId::new("8");

    let too_much = quality(QualityRuling::PartialRefund, Some(425_000));
    assert!(matches!(
        client.resolve_quality_dispute(&id, &too_much).await,
        Err(ApiError::Validation(_))
    ));
    assert_eq!(bodies.len(), 0);

    client
        .resolve_quality_dispute(&id, &quality(QualityRuling::PartialRefund, Some(200_000)))
        .await
        .unwrap();
    assert_eq!(
        bodies.last(),
        json!({"decision": "PARTIAL_REFUND", "reason": "Ảnh chụp cho thấy hàng bị đổi", "partialRefundAmount": 200_000})
    );

    client
        .resolve_quality_dispute(&id, &quality(QualityRuling::ApproveStore, None))
        .await
        .unwrap();
    assert_eq!(bodies.last()["shouldIncrementWarning"], true);
    assert_eq!(backend.log.count("/api/v1/admin/disputes/8/resolve-quality"), 2);
}

#[tokio::test]
async fn test_return_ruling_and_admin_message() {
    let bodies = Bodies::default();
    let router = {
        let messages = bodies.clone();
        Router::new()
            .route(
                "/api/v1/admin/disputes/{id}/resolve",
                capture_put(&bodies, json!({"id": 9, "status": "RESOLVED"})),
            )
            .route(
                "/api/v1/admin/disputes/{id}/message",
                post(move |Json(body): Json<Value>| {
                    let messages = messages.clone();
                    async move {
                        messages.push(body);
                        Json(ok(json!({"id": 9, "messages": [{"content": "Đã xem"}]})))
                    }
                }),
            )
    };
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let id = DisputeId::new("9");

    let resolved = client
        .resolve_return_dispute(&id, ReturnRuling::ApproveReturn, "Shop từ chối không có căn cứ")
        .await
        .unwrap();
    assert_eq!(resolved.status.as_deref(), Some("RESOLVED"));
    assert_eq!(
        bodies.last(),
        json!({"decision": "APPROVE_RETURN", "reason": "Shop từ chối không có căn cứ"})
    );

    assert!(matches!(
        client.post_admin_dispute_message(&id, "  ").await,
        Err(ApiError::Validation(_))
    ));
    let thread = client.post_admin_dispute_message(&id, "Đã xem").await.unwrap();
    assert_eq!(thread.messages.len(), 1);
    assert_eq!(bodies.last(), json!({"content": "Đã xem"}));
    assert_eq!(backend.log.to("/api/v1/admin/disputes/9/message").len(), 1);
}
