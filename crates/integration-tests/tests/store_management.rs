//! A store managing its own catalog, wallet, returns and reports.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use chrono::NaiveDate;
use marketplace_core::{DisputeId, ProductId, ReturnRequestId, StoreId, VariantId, Vnd};
use marketplace_integration_tests::{FakeBackend, ok, refused};
use marketplace_storefront::ApiError;
use marketplace_storefront::services::auth::Upload;
use marketplace_storefront::services::seller::analytics::StoreReport;
use marketplace_storefront::services::seller::catalog::VariantInput;
use marketplace_storefront::services::seller::returns::ReturnDecision;
use marketplace_storefront::services::seller::wallet::StoreWithdrawal;
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
}

/// Multipart fields of the last request to one route, in order.
#[derive(Clone, Default)]
struct Parts(Arc<Mutex<Vec<(String, Vec<u8>)>>>);

impl Parts {
    async fn read(&self, mut multipart: Multipart) {
        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_owned();
            fields.push((name, field.bytes().await.unwrap().to_vec()));
        }
        *self.0.lock().unwrap() = fields;
    }

    fn names(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    fn json(&self, name: &str) -> Value {
        let fields = self.0.lock().unwrap();
        let (_, bytes) = fields.iter().find(|(n, _)| n == name).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    fn text(&self, name: &str) -> String {
        let fields = self.0.lock().unwrap();
        let (_, bytes) = fields.iter().find(|(n, _)| n == name).unwrap();
        String::from_utf8(bytes.clone()).unwrap()
    }
}

fn variant(name: &str, price: i64) -> VariantInput {
    VariantInput {
        product_id: ProductId::new("p1"),
        name: name.into(),
        price: Vnd::new(price),
        stock: Some(5),
        description: None,
        attributes: BTreeMap::from([("ram".to_owned(), "8GB".to_owned())]),
    }
}

fn photo(name: &str) -> Upload {
    Upload::image(name, vec![0xFF, 0xD8, 0xFF])
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_variant_images_decide_the_endpoint() {
    let json_bodies = Bodies::default();
    let parts = Parts::default();
    let router = {
        let json_bodies = json_bodies.clone();
        let parts = parts.clone();
        Router::new()
            .route(
                "/api/v1/b2c/product-variants/create-without-image",
                post(move |Json(body): Json<Value>| {
                    let json_bodies = json_bodies.clone();
                    async move {
                        json_bodies.push(body);
                        Json(ok(json!({"id": 11, "productId": "p1", "name": "8GB", "price": 15_990_000})))
                    }
                }),
            )
            .route(
                "/api/v1/b2c/product-variants/create",
                post(move |multipart: Multipart| {
                    let parts = parts.clone();
                    async move {
                        parts.read(multipart).await;
                        Json(ok(json!({"id": 12, "productId": "p1", "name": "16GB", "price": 18_990_000})))
                    }
                }),
            )
    };
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();

    let plain = client
        .create_variant(&variant("8GB", 15_990_000), Vec::new())
        .await
        .unwrap();
    assert_eq!(plain.id, Some(VariantId::new("11")));
    assert_eq!(
        json_bodies.last(),
        json!({"productId": "p1", "name": "8GB", "price": 15_990_000, "stock": 5, "attributes": {"ram": "8GB"}})
    );
    assert_eq!(backend.log.count("/api/v1/b2c/product-variants/create"), 0);

    let pictured = client
        .create_variant(&variant("16GB", 18_990_000), vec![photo("front.jpg"), photo("back.jpg")])
        .await
        .unwrap();
    assert_eq!(pictured.price, Vnd::new(18_990_000));
    assert_eq!(parts.names(), ["dto", "images", "images"]);
    assert_eq!(parts.json("dto")["name"], "16GB");
    assert_eq!(backend.log.count("/api/v1/b2c/product-variants/create-without-image"), 1);
}

#[tokio::test]
async fn test_invalid_variant_writes_send_nothing() {
    let backend = FakeBackend::start(Router::new()).await.unwrap();
    let client = backend.client();
    let id = VariantId::new("v9");

    let err = client
        .create_variant(&variant("  ", 100_000), Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Tên biến thể là bắt buộc");
    assert!(matches!(
        client.update_variant_price(&id, Vnd::ZERO).await,
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        client.update_variant_images(&id, Vec::new(), 0).await,
        Err(ApiError::Validation(_))
    ));
    let err = client
        .update_variant_images(&id, vec![photo("a.jpg")], 1)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Ảnh chính không hợp lệ");
    assert!(backend.log.all().is_empty());
}

#[tokio::test]
async fn test_price_and_stock_are_bare_numbers() {
    let bodies = Bodies::default();
    let capture = |bodies: Bodies| {
        put(move |Json(body): Json<Value>| {
            let bodies = bodies.clone();
            async move {
                bodies.push(body);
                Json(ok(json!({"id": "v9"})))
            }
        })
    };
    let router = Router::new()
        .route("/api/v1/b2c/product-variants/update-price/{id}", capture(bodies.clone()))
        .route("/api/v1/b2c/product-variants/update-stock/{id}", capture(bodies.clone()))
        .route("/api/v1/b2c/product-variants/{id}", capture(bodies.clone()));
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let id = VariantId::new("v9");

    client.update_variant_price(&id, Vnd::new(14_490_000)).await.unwrap();
    assert_eq!(bodies.last(), json!(14_490_000));
    client.update_variant_stock(&id, 0).await.unwrap();
    assert_eq!(bodies.last(), json!(0));
    client.delete_variant(&id).await.unwrap();
    assert_eq!(bodies.last(), json!({"status": "DELETED"}));
    assert_eq!(backend.log.to("/api/v1/b2c/product-variants/v9")[0].method, "PUT");
}

#[tokio::test]
async fn test_gallery_marks_the_primary_image() {
    let parts = Parts::default();
    let router = {
        let parts = parts.clone();
        Router::new().route(
            "/api/v1/b2c/product-variants/update-images/{id}",
            put(move |multipart: Multipart| {
                let parts = parts.clone();
                async move {
                    parts.read(multipart).await;
                    Json(ok(json!({"id": "v9"})))
                }
            }),
        )
    };
    let backend = FakeBackend::start(router).await.unwrap();

    backend
        .client()
        .update_variant_images(&VariantId::new("v9"), vec![photo("a.jpg"), photo("b.png")], 1)
        .await
        .unwrap();

    let sent = backend.log.to("/api/v1/b2c/product-variants/update-images/v9");
    assert_eq!(sent[0].query.as_deref(), Some("indexPrimary=1"));
    assert_eq!(parts.names(), ["images", "images"]);
}

// =============================================================================
// Wallet
// =============================================================================

fn withdrawal(amount: i64) -> StoreWithdrawal {
    StoreWithdrawal {
        amount: Vnd::new(amount),
        bank_name: "Vietcombank".into(),
        bank_account: "0071000123456".into(),
        account_holder: "NGUYEN VAN AN".into(),
        note: None,
    }
}

#[tokio::test]
async fn test_withdrawal_is_checked_against_the_balance() {
    let bodies = Bodies::default();
    let router = {
        let bodies = bodies.clone();
        Router::new()
            .route(
                "/api/v1/b2c/wallet/store/{id}",
                get(|| async { Json(ok(json!({"balance": 400_000, "totalEarned": 1_200_000}))) }),
            )
            .route(
                "/api/v1/b2c/wallet/store/{id}/withdrawal",
                post(move |Json(body): Json<Value>| {
                    let bodies = bodies.clone();
                    async move {
                        bodies.push(body);
                        Json(ok(json!({"id": 31, "amount": 300_000, "status": "PENDING"})))
                    }
                }),
            )
    };
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let store = StoreId::new("3");

    let err = client
        .request_store_withdrawal(&store, &withdrawal(500_000))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Số tiền rút vượt quá số dư khả dụng");
    assert_eq!(backend.log.count("/api/v1/b2c/wallet/store/3/withdrawal"), 0);

    let pending = client
        .request_store_withdrawal(&store, &withdrawal(300_000))
        .await
        .unwrap();
    assert_eq!(pending.status.as_deref(), Some("PENDING"));
    assert_eq!(bodies.last()["bankAccount"], "0071000123456");
    assert_eq!(bodies.last()["amount"], 300_000);
    assert_eq!(backend.log.count("/api/v1/b2c/wallet/store/3"), 2);
}

// =============================================================================
// Returns & disputes
// =============================================================================

#[tokio::test]
async fn test_return_rejection_travels_as_dto_part() {
    let parts = Parts::default();
    let router = {
        let parts = parts.clone();
        Router::new()
            .route(
                "/api/v1/b2c/returns/store/{store}/returnRequest/{id}/respond",
                put(move |multipart: Multipart| {
                    let parts = parts.clone();
                    async move {
                        parts.read(multipart).await;
                        Json(ok(json!({"id": "r1", "status": "REJECTED"})))
                    }
                }),
            )
            .route(
                "/api/v1/b2c/returns/store/{store}/returnRequest/{id}/confirm-ok",
                put(|| async { Json(ok(json!({"id": "r2", "status": "COMPLETED"}))) }),
            )
    };
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let store = StoreId::new("3");

    let decision = ReturnDecision::reject("Sản phẩm đã qua sử dụng").unwrap();
    client
        .respond_to_return(&store, &ReturnRequestId::new("r1"), &decision, vec![photo("seal.jpg")])
        .await
        .unwrap();
    assert_eq!(parts.names(), ["dto", "evidenceFiles"]);
    assert_eq!(
        parts.json("dto"),
        json!({"approved": false, "reason": "Sản phẩm đã qua sử dụng"})
    );

    client
        .confirm_return_received(&store, &ReturnRequestId::new("r2"))
        .await
        .unwrap();
    let confirm = backend.log.to("/api/v1/b2c/returns/store/3/returnRequest/r2/confirm-ok");
    assert_eq!(confirm[0].method, "PUT");
}

#[tokio::test]
async fn test_quality_dispute_sends_text_fields() {
    let parts = Parts::default();
    let router = {
        let parts = parts.clone();
        Router::new().route(
            "/api/v1/b2c/returns/store/{store}/returnRequest/{id}/dispute-quality",
            post(move |multipart: Multipart| {
                let parts = parts.clone();
                async move {
                    parts.read(multipart).await;
                    Json(ok(json!({"id": 8, "status": "OPEN"})))
                }
            }),
        )
    };
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let store = StoreId::new("3");
    let id = ReturnRequestId::new("r1");

    assert!(matches!(
        client.dispute_return_quality(&store, &id, " ", None, Vec::new()).await,
        Err(ApiError::Validation(_))
    ));
    assert!(backend.log.all().is_empty());

    client
        .dispute_return_quality(&store, &id, "WRONG_ITEM", Some("  "), vec![photo("box.jpg")])
        .await
        .unwrap();
    assert_eq!(parts.names(), ["reason", "evidenceFiles"]);
    assert_eq!(parts.text("reason"), "WRONG_ITEM");
}

#[tokio::test]
async fn test_store_dispute_is_found_in_the_listing() {
    let router = Router::new().route(
        "/api/v1/b2c/returns/store/{store}/disputes",
        get(|| async {
            Json(ok(json!({"content": [{"id": 1, "status": "OPEN"}, {"id": 2, "status": "RESOLVED"}],
                           "totalElements": 2})))
        }),
    );
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let store = StoreId::new("3");

    let found = client.store_dispute(&store, &DisputeId::new("2")).await.unwrap();
    assert_eq!(found.id, Some(DisputeId::new("2")));

    let err = client
        .store_dispute(&store, &DisputeId::new("5"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let scans = backend.log.to("/api/v1/b2c/returns/store/3/disputes");
    assert_eq!(scans.len(), 2);
    assert!(scans[0].query.as_deref().unwrap().contains("size=1000"));
}

// =============================================================================
// Analytics
// =============================================================================

#[tokio::test]
async fn test_missing_reports_are_none() {
    let router = Router::new()
        .route(
            "/api/v1/b2c/analytics/dashboard/{store}",
            get(|| async { (StatusCode::NOT_FOUND, Json(refused("No static resource"))) }),
        )
        .route(
            "/api/v1/b2c/analytics/reviews/{store}",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(refused("boom"))) }),
        )
        .route(
            "/api/v1/b2c/analytics/inventory/{store}",
            get(|| async { (StatusCode::FORBIDDEN, Json(refused("Không có quyền"))) }),
        )
        .route(
            "/api/v1/b2c/analytics/products/{store}/top",
            get(|| async { Json(ok(json!([{"name": "Áo thun", "sold": 42}]))) }),
        );
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let store = StoreId::new("3");

    assert_eq!(client.store_report(&store, StoreReport::Dashboard).await.unwrap(), None);
    assert_eq!(client.store_report(&store, StoreReport::Reviews).await.unwrap(), None);
    assert!(client.store_report(&store, StoreReport::Inventory).await.is_err());

    let top = client.store_top_products(&store, 5).await.unwrap().unwrap();
    assert_eq!(top[0]["sold"], 42);
    let sent = backend.log.to("/api/v1/b2c/analytics/products/3/top");
    assert_eq!(sent[0].query.as_deref(), Some("limit=5"));
}

#[tokio::test]
async fn test_revenue_range_is_ordered() {
    let router = Router::new().route(
        "/api/v1/b2c/analytics/revenue/{store}/date-range",
        get(|| async { Json(ok(json!({"total": 2_500_000}))) }),
    );
    let backend = FakeBackend::start(router).await.unwrap();
    let client = backend.client();
    let store = StoreId::new("3");
    let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();

    assert!(matches!(
        client.store_revenue_between(&store, day(30), day(1)).await,
        Err(ApiError::Validation(_))
    ));
    let report = client
        .store_revenue_between(&store, day(1), day(30))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report["total"], 2_500_000);

    let sent = backend.log.to("/api/v1/b2c/analytics/revenue/3/date-range");
    assert_eq!(sent.len(), 1);
    let query = sent[0].query.as_deref().unwrap();
    assert!(query.contains("startDate=2024-06-01"));
    assert!(query.contains("endDate=2024-06-30"));
}
