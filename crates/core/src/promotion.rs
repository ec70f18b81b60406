//! Promotions and discount reconciliation.
//!
//! Promotion records come from several backend endpoints (platform promotions,
//! store promotions, admin listings) that disagree on field names. A promotion
//! is decoded through [`RawPromotion`], which keeps every spelling, and then
//! normalised: the first non-empty alias wins.
//!
//! At checkout a code is looked up in the platform list first and then in the
//! store list ([`PromotionCatalog::find_code`]), validated
//! ([`Promotion::check`]), priced ([`Promotion::discount_for`]), and finally
//! routed into the slot of the order request the backend expects
//! ([`PromotionSlots`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::time::{format_date_vn, opt_timestamp};
use crate::types::{PromotionId, PromotionStatus, StoreId, Vnd};

/// How a promotion's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// `value` percent of the order, optionally capped.
    #[default]
    Percentage,
    /// `value` đồng off.
    FixedAmount,
}

impl DiscountKind {
    fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PERCENTAGE" | "PERCENT" => Some(Self::Percentage),
            "FIXED_AMOUNT" | "FIXED" | "AMOUNT" => Some(Self::FixedAmount),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Percentage => "Giảm theo %",
            Self::FixedAmount => "Giảm cố định",
        }
    }
}

/// What a promotion discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionTarget {
    #[default]
    Order,
    Shipping,
}

/// Wire shape of a promotion, every alias kept separately.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPromotion {
    id: Option<PromotionId>,
    #[serde(default)]
    code: Option<String>,
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    type_: Option<String>,
    discount_type: Option<String>,
    target: Option<PromotionTarget>,
    discount_value: Option<Decimal>,
    value: Option<Decimal>,
    max_discount_value: Option<Vnd>,
    max_discount_amount: Option<Vnd>,
    max_discount: Option<Vnd>,
    min_order_value: Option<Vnd>,
    min_order_amount: Option<Vnd>,
    max_usage_count: Option<u32>,
    current_usage_count: Option<u32>,
    max_usage_per_user: Option<u32>,
    #[serde(default, with = "opt_timestamp")]
    start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    end_date: Option<DateTime<Utc>>,
    status: Option<PromotionStatus>,
    store_id: Option<StoreId>,
}

fn first_positive<T, I>(candidates: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
    T: PartialOrd + Default,
{
    candidates
        .into_iter()
        .flatten()
        .find(|v| *v > T::default())
}

impl From<RawPromotion> for Promotion {
    fn from(raw: RawPromotion) -> Self {
        let type_fields = [raw.type_.as_deref(), raw.discount_type.as_deref()];

        // Percentage wins when either field says so.
        let kinds: Vec<DiscountKind> = type_fields
            .iter()
            .flatten()
            .filter_map(|v| DiscountKind::from_wire(v))
            .collect();
        let kind = if kinds.contains(&DiscountKind::Percentage) {
            DiscountKind::Percentage
        } else {
            kinds.first().copied().unwrap_or_default()
        };

        let ships = type_fields.iter().flatten().any(|v| {
            matches!(
                v.trim().to_ascii_uppercase().as_str(),
                "SHIPPING" | "FREE_SHIPPING"
            )
        });
        let target = if ships || raw.target == Some(PromotionTarget::Shipping) {
            PromotionTarget::Shipping
        } else {
            PromotionTarget::Order
        };

        Self {
            id: raw.id,
            code: raw.code.unwrap_or_default().trim().to_uppercase(),
            name: raw.name,
            description: raw.description,
            kind,
            target,
            value: first_positive([raw.discount_value, raw.value]).unwrap_or_default(),
            max_discount: first_positive([
                raw.max_discount_value,
                raw.max_discount_amount,
                raw.max_discount,
            ]),
            min_order: first_positive([raw.min_order_value, raw.min_order_amount])
                .unwrap_or_default(),
            max_usage_count: raw.max_usage_count.filter(|&n| n > 0),
            current_usage_count: raw.current_usage_count.unwrap_or(0),
            max_usage_per_user: raw.max_usage_per_user.filter(|&n| n > 0),
            start_date: raw.start_date,
            end_date: raw.end_date,
            status: raw.status.unwrap_or(PromotionStatus::Unknown),
            store_id: raw.store_id,
        }
    }
}

/// A normalised promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPromotion", rename_all = "camelCase")]
pub struct Promotion {
    pub id: Option<PromotionId>,
    /// Upper-cased code.
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub target: PromotionTarget,
    /// Percent for [`DiscountKind::Percentage`], đồng for fixed amounts.
    #[serde(rename = "discountValue")]
    pub value: Decimal,
    #[serde(rename = "maxDiscountValue")]
    pub max_discount: Option<Vnd>,
    #[serde(rename = "minOrderValue")]
    pub min_order: Vnd,
    /// `None` means unlimited.
    pub max_usage_count: Option<u32>,
    pub current_usage_count: u32,
    pub max_usage_per_user: Option<u32>,
    #[serde(with = "opt_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    pub status: PromotionStatus,
    pub store_id: Option<StoreId>,
}

impl Promotion {
    /// Discount this promotion grants on `order_total`.
    ///
    /// Never exceeds the order total; a zero total yields zero.
    #[must_use]
    pub fn discount_for(&self, order_total: Vnd) -> Vnd {
        if !order_total.is_positive() {
            return Vnd::ZERO;
        }
        let discount = match self.kind {
            DiscountKind::Percentage => {
                let raw = order_total.percent(self.value);
                match self.max_discount {
                    Some(cap) if cap.is_positive() && raw > cap => cap,
                    _ => raw,
                }
            }
            DiscountKind::FixedAmount => Vnd::from_decimal(self.value),
        };
        discount.min(order_total).max(Vnd::ZERO)
    }

    fn usage_exhausted(&self) -> bool {
        self.max_usage_count
            .is_some_and(|max| self.current_usage_count >= max)
    }

    /// Active, inside its date window, and not used up.
    ///
    /// Missing start or end dates leave that side of the window open.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PromotionStatus::Active
            && self.start_date.is_none_or(|start| now >= start)
            && self.end_date.is_none_or(|end| now <= end)
            && !self.usage_exhausted()
    }

    /// Check whether the promotion can be used on an order.
    ///
    /// # Errors
    ///
    /// Returns the first reason the promotion is unusable, checked in the
    /// order: status, start date, end date, global usage, per-user usage,
    /// minimum order value.
    pub fn check(
        &self,
        order_total: Vnd,
        user_usage: u32,
        now: DateTime<Utc>,
    ) -> Result<(), PromotionRejection> {
        if self.status != PromotionStatus::Active {
            return Err(PromotionRejection::Inactive);
        }
        if let Some(start) = self.start_date.filter(|start| now < *start) {
            return Err(PromotionRejection::NotStarted(start));
        }
        if self.end_date.is_some_and(|end| now > end) {
            return Err(PromotionRejection::Expired);
        }
        if self.usage_exhausted() {
            return Err(PromotionRejection::UsedUp);
        }
        if let Some(limit) = self.max_usage_per_user.filter(|&limit| user_usage >= limit) {
            return Err(PromotionRejection::PerUserLimit(limit));
        }
        if order_total < self.min_order {
            return Err(PromotionRejection::BelowMinimum(self.min_order));
        }
        Ok(())
    }

    /// Human-readable value: `10%`, `10% (tối đa 50.000đ)` or `50.000đ`.
    #[must_use]
    pub fn display_value(&self) -> String {
        match self.kind {
            DiscountKind::Percentage => {
                let mut text = format!("{}%", self.value.normalize());
                if let Some(cap) = self.max_discount.filter(|c| c.is_positive()) {
                    text.push_str(&format!(" (tối đa {cap})"));
                }
                text
            }
            DiscountKind::FixedAmount => Vnd::from_decimal(self.value).to_string(),
        }
    }

    #[must_use]
    pub const fn is_shipping(&self) -> bool {
        matches!(self.target, PromotionTarget::Shipping)
    }
}

/// Pick the usable promotion that saves the most on `order_total`.
#[must_use]
pub fn best_for(promotions: &[Promotion], order_total: Vnd, now: DateTime<Utc>) -> Option<&Promotion> {
    promotions
        .iter()
        .filter(|p| p.check(order_total, 0, now).is_ok())
        .max_by_key(|p| p.discount_for(order_total))
}

/// Why a promotion code cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionRejection {
    #[error("Mã {0} không tồn tại hoặc không khả dụng")]
    NotFound(String),

    #[error("Mã khuyến mãi không còn hoạt động")]
    Inactive,

    #[error("Mã khuyến mãi chưa bắt đầu. Có hiệu lực từ {}", vn_date(.0))]
    NotStarted(DateTime<Utc>),

    #[error("Mã khuyến mãi đã hết hạn")]
    Expired,

    #[error("Mã khuyến mãi đã hết lượt sử dụng")]
    UsedUp,

    #[error("Bạn đã sử dụng tối đa {0} lần cho mã này")]
    PerUserLimit(u32),

    #[error("Đơn hàng tối thiểu {0} để sử dụng mã này")]
    BelowMinimum(Vnd),
}

fn vn_date(at: &DateTime<Utc>) -> String {
    format_date_vn(*at)
}

/// Who issued a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "storeId", rename_all = "lowercase")]
pub enum PromotionScope {
    Platform,
    Store(StoreId),
}

/// Promotions available for one checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionCatalog {
    pub platform: Vec<Promotion>,
    /// The store these promotions belong to, when the cart has one store.
    pub store_id: Option<StoreId>,
    pub store: Vec<Promotion>,
}

impl PromotionCatalog {
    #[must_use]
    pub const fn new(platform: Vec<Promotion>) -> Self {
        Self {
            platform,
            store_id: None,
            store: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store_id: StoreId, promotions: Vec<Promotion>) -> Self {
        self.store_id = Some(store_id);
        self.store = promotions;
        self
    }

    /// Normalise a code the way buyers type it.
    #[must_use]
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Find a code, platform promotions first.
    #[must_use]
    pub fn find_code(&self, code: &str) -> Option<(&Promotion, PromotionScope)> {
        let code = Self::normalize_code(code);
        if code.is_empty() {
            return None;
        }
        if let Some(found) = self.platform.iter().find(|p| p.code == code) {
            return Some((found, PromotionScope::Platform));
        }
        let found = self.store.iter().find(|p| p.code == code)?;
        let store_id = found.store_id.clone().or_else(|| self.store_id.clone())?;
        Some((found, PromotionScope::Store(store_id)))
    }

    /// Every promotion, platform first.
    pub fn iter(&self) -> impl Iterator<Item = (&Promotion, bool)> {
        self.platform
            .iter()
            .map(|p| (p, false))
            .chain(self.store.iter().map(|p| (p, true)))
    }
}

/// A promotion code accepted for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromotion {
    pub code: String,
    pub promotion: Promotion,
    pub scope: PromotionScope,
    pub discount: Vnd,
}

impl AppliedPromotion {
    /// Look up, validate and price a code.
    ///
    /// # Errors
    ///
    /// [`PromotionRejection::NotFound`] when neither list has the code,
    /// otherwise the first failed check from [`Promotion::check`].
    pub fn apply(
        catalog: &PromotionCatalog,
        code: &str,
        order_total: Vnd,
        now: DateTime<Utc>,
    ) -> Result<Self, PromotionRejection> {
        let normalized = PromotionCatalog::normalize_code(code);
        let (promotion, scope) = catalog
            .find_code(&normalized)
            .ok_or_else(|| PromotionRejection::NotFound(normalized.clone()))?;
        promotion.check(order_total, 0, now)?;
        Ok(Self {
            discount: promotion.discount_for(order_total),
            code: normalized,
            promotion: promotion.clone(),
            scope,
        })
    }

    #[must_use]
    pub const fn is_store_promotion(&self) -> bool {
        matches!(self.scope, PromotionScope::Store(_))
    }
}

/// Platform promotion codes on an order request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPromotions {
    pub order_promotion_code: Option<String>,
    pub shipping_promotion_code: Option<String>,
}

/// Where an applied code goes on the order request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionSlots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_promotions: Option<PlatformPromotions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_promotions: Option<BTreeMap<StoreId, String>>,
}

impl PromotionSlots {
    /// Route an applied code.
    ///
    /// Store codes go into `storePromotions` only when the order belongs to
    /// exactly one store (`primary_store`); anything else is sent as a
    /// platform code, in the shipping slot for shipping promotions.
    #[must_use]
    pub fn route(applied: Option<&AppliedPromotion>, primary_store: Option<&StoreId>) -> Self {
        let Some(applied) = applied else {
            return Self::default();
        };
        if let (true, Some(store)) = (applied.is_store_promotion(), primary_store) {
            return Self {
                platform_promotions: None,
                store_promotions: Some(BTreeMap::from([(store.clone(), applied.code.clone())])),
            };
        }
        let code = Some(applied.code.clone());
        let platform = if applied.promotion.is_shipping() {
            PlatformPromotions {
                order_promotion_code: None,
                shipping_promotion_code: code,
            }
        } else {
            PlatformPromotions {
                order_promotion_code: code,
                shipping_promotion_code: None,
            }
        };
        Self {
            platform_promotions: Some(platform),
            store_promotions: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn promo(value: serde_json::Value) -> Promotion {
        serde_json::from_value(value).unwrap()
    }

    fn active(code: &str, extra: serde_json::Value) -> Promotion {
        let mut base = json!({
            "code": code,
            "status": "ACTIVE",
            "startDate": "2024-01-01T00:00:00",
            "endDate": "2024-12-31T23:59:59",
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        promo(base)
    }

    #[test]
    fn test_aliases_first_non_empty_wins() {
        let p = promo(json!({
            "code": " sale10 ",
            "discountType": "percent",
            "discountValue": 0,
            "value": 10,
            "maxDiscountAmount": 50000,
            "minOrderAmount": "100000",
        }));
        assert_eq!(p.code, "SALE10");
        assert_eq!(p.kind, DiscountKind::Percentage);
        assert_eq!(p.value, Decimal::from(10));
        assert_eq!(p.max_discount, Some(Vnd::new(50_000)));
        assert_eq!(p.min_order, Vnd::new(100_000));
    }

    #[test]
    fn test_kind_defaults_to_percentage() {
        let p = promo(json!({"code": "X", "type": "ORDER", "value": 5}));
        assert_eq!(p.kind, DiscountKind::Percentage);
        let p = promo(json!({"code": "X", "type": "ORDER", "discountType": "FIXED", "value": 5}));
        assert_eq!(p.kind, DiscountKind::FixedAmount);
    }

    #[test]
    fn test_percentage_discount_capped() {
        let p = active("P", json!({"type": "PERCENTAGE", "discountValue": 20, "maxDiscountValue": 50000}));
        assert_eq!(p.discount_for(Vnd::new(100_000)), Vnd::new(20_000));
        assert_eq!(p.discount_for(Vnd::new(1_000_000)), Vnd::new(50_000));
        assert_eq!(p.discount_for(Vnd::ZERO), Vnd::ZERO);
    }

    #[test]
    fn test_zero_cap_means_uncapped() {
        let p = active("P", json!({"type": "PERCENTAGE", "discountValue": 50, "maxDiscount": 0}));
        assert_eq!(p.discount_for(Vnd::new(1_000_000)), Vnd::new(500_000));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_total() {
        let p = active("F", json!({"type": "FIXED_AMOUNT", "value": 80000}));
        assert_eq!(p.discount_for(Vnd::new(200_000)), Vnd::new(80_000));
        assert_eq!(p.discount_for(Vnd::new(50_000)), Vnd::new(50_000));
    }

    #[test]
    fn test_check_order() {
        let p = promo(json!({"code": "A", "status": "INACTIVE", "endDate": "2000-01-01"}));
        assert_eq!(p.check(Vnd::new(1), 0, now()), Err(PromotionRejection::Inactive));

        let p = active("A", json!({"startDate": "2024-07-01T00:00:00"}));
        assert!(matches!(p.check(Vnd::new(1), 0, now()), Err(PromotionRejection::NotStarted(_))));

        let p = active("A", json!({"endDate": "2024-06-01T00:00:00", "maxUsageCount": 1, "currentUsageCount": 1}));
        assert_eq!(p.check(Vnd::new(1), 0, now()), Err(PromotionRejection::Expired));

        let p = active("A", json!({"maxUsageCount": 5, "currentUsageCount": 5}));
        assert_eq!(p.check(Vnd::new(1), 0, now()), Err(PromotionRejection::UsedUp));
        assert!(!p.is_valid_at(now()));

        let p = active("A", json!({"maxUsagePerUser": 2, "minOrderValue": 500000}));
        assert_eq!(p.check(Vnd::new(1), 2, now()), Err(PromotionRejection::PerUserLimit(2)));
        assert_eq!(
            p.check(Vnd::new(1), 0, now()),
            Err(PromotionRejection::BelowMinimum(Vnd::new(500_000)))
        );
        assert!(p.check(Vnd::new(500_000), 0, now()).is_ok());
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            PromotionRejection::BelowMinimum(Vnd::new(200_000)).to_string(),
            "Đơn hàng tối thiểu 200.000đ để sử dụng mã này"
        );
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        assert_eq!(
            PromotionRejection::NotStarted(start).to_string(),
            "Mã khuyến mãi chưa bắt đầu. Có hiệu lực từ 01/07/2024"
        );
    }

    #[test]
    fn test_display_value() {
        let p = active("A", json!({"type": "PERCENTAGE", "value": 10}));
        assert_eq!(p.display_value(), "10%");
        let p = active("A", json!({"type": "PERCENTAGE", "value": 10, "maxDiscountValue": 50000}));
        assert_eq!(p.display_value(), "10% (tối đa 50.000đ)");
        let p = active("A", json!({"type": "FIXED", "value": 50000}));
        assert_eq!(p.display_value(), "50.000đ");
    }

    #[test]
    fn test_find_code_platform_first() {
        let catalog = PromotionCatalog::new(vec![active("SAME", json!({"value": 5}))])
            .with_store(StoreId::new("s1"), vec![active("SAME", json!({"value": 9})), active("SHOP", json!({}))]);

        let (p, scope) = catalog.find_code(" same ").unwrap();
        assert_eq!(p.value, Decimal::from(5));
        assert_eq!(scope, PromotionScope::Platform);

        let (_, scope) = catalog.find_code("shop").unwrap();
        assert_eq!(scope, PromotionScope::Store(StoreId::new("s1")));

        assert!(catalog.find_code("nope").is_none());
    }

    #[test]
    fn test_apply_runs_all_checks() {
        let catalog = PromotionCatalog::new(vec![
            active("TEN", json!({"value": 10, "minOrderValue": 100000})),
        ]);
        let applied = AppliedPromotion::apply(&catalog, "ten", Vnd::new(300_000), now()).unwrap();
        assert_eq!(applied.code, "TEN");
        assert_eq!(applied.discount, Vnd::new(30_000));

        assert_eq!(
            AppliedPromotion::apply(&catalog, "ten", Vnd::new(50_000), now()).unwrap_err(),
            PromotionRejection::BelowMinimum(Vnd::new(100_000))
        );
        assert_eq!(
            AppliedPromotion::apply(&catalog, "xyz", Vnd::new(50_000), now()).unwrap_err(),
            PromotionRejection::NotFound("XYZ".into())
        );
    }

    #[test]
    fn test_slots_routing() {
        let store = StoreId::new("s1");
        let catalog = PromotionCatalog::new(vec![
            active("SHIP", json!({"type": "FREE_SHIPPING", "discountType": "FIXED", "value": 15000})),
            active("ORDER", json!({"value": 10})),
        ])
        .with_store(store.clone(), vec![active("SHOP", json!({"value": 5}))]);
        let total = Vnd::new(100_000);

        let shop = AppliedPromotion::apply(&catalog, "SHOP", total, now()).unwrap();
        let slots = PromotionSlots::route(Some(&shop), Some(&store));
        assert_eq!(slots.store_promotions.unwrap()[&store], "SHOP");
        assert!(slots.platform_promotions.is_none());

        let slots = PromotionSlots::route(Some(&shop), None);
        assert_eq!(
            slots.platform_promotions.unwrap().order_promotion_code.as_deref(),
            Some("SHOP")
        );

        let ship = AppliedPromotion::apply(&catalog, "SHIP", total, now()).unwrap();
        let slots = serde_json::to_value(PromotionSlots::route(Some(&ship), Some(&store))).unwrap();
        assert_eq!(slots["platformPromotions"]["shippingPromotionCode"], "SHIP");
        assert!(slots["platformPromotions"]["orderPromotionCode"].is_null());
        assert!(slots.get("storePromotions").is_none());

        let empty = serde_json::to_value(PromotionSlots::route(None, Some(&store))).unwrap();
        assert_eq!(empty, json!({}));
    }

    #[test]
    fn test_best_for_picks_largest_usable() {
        let promos = vec![
            active("SMALL", json!({"type": "FIXED", "value": 10000})),
            active("BIG", json!({"type": "PERCENTAGE", "value": 20})),
            active("LOCKED", json!({"type": "FIXED", "value": 90000, "minOrderValue": 1000000})),
        ];
        let best = best_for(&promos, Vnd::new(200_000), now()).unwrap();
        assert_eq!(best.code, "BIG");
    }
}
