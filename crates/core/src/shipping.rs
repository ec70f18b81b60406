//! Shipping fee and delivery estimation.
//!
//! Fees are tiered by how far apart the seller's and buyer's provinces are,
//! plus a per-kilogram surcharge above the first kilogram. Provinces are
//! matched to one of three regions by case-insensitive substring, so
//! `"Thành phố Hà Nội"` and `"hà nội"` both land in the north.

use core::fmt;
use core::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Vnd;

const NORTH: &[&str] = &[
    "hà nội",
    "hải phòng",
    "hải dương",
    "hưng yên",
    "hà nam",
    "nam định",
    "thái bình",
    "ninh bình",
    "vĩnh phúc",
    "bắc ninh",
    "quảng ninh",
    "lạng sơn",
    "cao bằng",
    "bắc kạn",
    "thái nguyên",
    "tuyên quang",
    "yên bái",
    "lào cai",
    "điện biên",
    "sơn la",
    "lai châu",
    "hoà bình",
    "hòa bình",
    "phú thọ",
    "bắc giang",
];

const CENTRAL: &[&str] = &[
    "thanh hóa",
    "nghệ an",
    "hà tĩnh",
    "quảng bình",
    "quảng trị",
    "thừa thiên huế",
    "đà nẵng",
    "quảng nam",
    "quảng ngãi",
    "bình định",
    "phú yên",
    "khánh hòa",
    "ninh thuận",
    "bình thuận",
    "kon tum",
    "gia lai",
    "đắk lắk",
    "đắk nông",
    "lâm đồng",
];

const SOUTH: &[&str] = &[
    "bình phước",
    "tây ninh",
    "bình dương",
    "đồng nai",
    "bà rịa - vũng tàu",
    "thành phố hồ chí minh",
    "hồ chí minh",
    "tp. hồ chí minh",
    "tp hcm",
    "long an",
    "tiền giang",
    "bến tre",
    "trà vinh",
    "vĩnh long",
    "đồng tháp",
    "an giang",
    "kiên giang",
    "cà mau",
    "bạc liêu",
    "sóc trăng",
    "hậu giang",
    "cần thơ",
];

/// Fee charged when the route cannot be classified.
pub const FLAT_FEE: Vnd = Vnd::new(30_000);

/// Surcharge per kilogram above the first.
pub const SURCHARGE_PER_KG: Vnd = Vnd::new(5_000);

/// Assumed weight of one unit when products carry no weight.
pub const DEFAULT_UNIT_WEIGHT_KG: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Geographic region of Vietnam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    Central,
    South,
}

impl Region {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::North => "Miền Bắc",
            Self::Central => "Miền Trung",
            Self::South => "Miền Nam",
        }
    }

    /// Neighbouring regions share a border; north and south do not.
    #[must_use]
    pub const fn is_adjacent(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::North | Self::South, Self::Central) | (Self::Central, Self::North | Self::South)
        )
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Region a province belongs to. North is checked first, then central, then
/// south.
#[must_use]
pub fn region_of(province: &str) -> Option<Region> {
    let name = province.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    [
        (Region::North, NORTH),
        (Region::Central, CENTRAL),
        (Region::South, SOUTH),
    ]
    .into_iter()
    .find(|(_, list)| list.iter().any(|p| name.contains(p)))
    .map(|(region, _)| region)
}

/// Distance class of a shipping route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingTier {
    SameProvince,
    SameRegion,
    AdjacentRegion,
    FarRegion,
    /// A province was missing or could not be placed in a region.
    Unknown,
}

impl ShippingTier {
    /// Classify the route between two provinces.
    #[must_use]
    pub fn classify(from: Option<&str>, to: Option<&str>) -> Self {
        let (Some(from), Some(to)) = (nonblank(from), nonblank(to)) else {
            return Self::Unknown;
        };
        if from.to_lowercase() == to.to_lowercase() {
            return Self::SameProvince;
        }
        match (region_of(from), region_of(to)) {
            (Some(a), Some(b)) if a == b => Self::SameRegion,
            (Some(a), Some(b)) if a.is_adjacent(b) => Self::AdjacentRegion,
            (Some(_), Some(_)) => Self::FarRegion,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn base_fee(self) -> Vnd {
        match self {
            Self::SameProvince => Vnd::new(15_000),
            Self::SameRegion | Self::Unknown => FLAT_FEE,
            Self::AdjacentRegion => Vnd::new(45_000),
            Self::FarRegion => Vnd::new(60_000),
        }
    }

    /// Business days from order to delivery.
    #[must_use]
    pub const fn delivery_days(self) -> RangeInclusive<u32> {
        match self {
            Self::SameProvince => 1..=2,
            Self::SameRegion => 2..=3,
            Self::AdjacentRegion | Self::Unknown => 3..=5,
            Self::FarRegion => 4..=6,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SameProvince => "Nội tỉnh",
            Self::SameRegion => "Nội vùng",
            Self::AdjacentRegion => "Vùng lân cận",
            Self::FarRegion => "Liên vùng",
            Self::Unknown => "Mặc định",
        }
    }
}

fn nonblank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A priced shipping route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub tier: ShippingTier,
    pub fee: Vnd,
    pub delivery_days: RangeInclusive<u32>,
}

/// Price a parcel of `weight_kg` from one province to another.
///
/// Unclassifiable routes pay [`FLAT_FEE`] with no weight surcharge.
#[must_use]
pub fn estimate(from: Option<&str>, to: Option<&str>, weight_kg: Decimal) -> ShippingQuote {
    let tier = ShippingTier::classify(from, to);
    let fee = match tier {
        ShippingTier::Unknown => FLAT_FEE,
        _ => tier.base_fee() + weight_surcharge(weight_kg),
    };
    ShippingQuote {
        tier,
        fee,
        delivery_days: tier.delivery_days(),
    }
}

/// Surcharge for everything above the first kilogram.
#[must_use]
pub fn weight_surcharge(weight_kg: Decimal) -> Vnd {
    let extra = (weight_kg - Decimal::ONE).max(Decimal::ZERO);
    Vnd::from_decimal(extra * SURCHARGE_PER_KG.to_decimal())
}

/// Estimated parcel weight for `units` items.
#[must_use]
pub fn parcel_weight(units: u32) -> Decimal {
    DEFAULT_UNIT_WEIGHT_KG * Decimal::from(units)
}

/// Latest expected delivery date for an order placed on `order_date`,
/// counting only weekdays.
#[must_use]
pub fn expected_delivery_date(
    from: Option<&str>,
    to: Option<&str>,
    order_date: NaiveDate,
) -> NaiveDate {
    let days = *ShippingTier::classify(from, to).delivery_days().end();
    add_business_days(order_date, days)
}

/// Advance `days` weekdays past `date`.
#[must_use]
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        let Some(next) = current.checked_add_days(Days::new(1)) else {
            break;
        };
        current = next;
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    current
}

/// Time left until an expected delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DeliveryCountdown {
    Overdue,
    Hours(i64),
    Days(i64),
}

impl fmt::Display for DeliveryCountdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overdue => f.write_str("Đã quá hạn"),
            Self::Hours(h) => write!(f, "Còn {h} giờ"),
            Self::Days(d) => write!(f, "Còn {d} ngày"),
        }
    }
}

#[must_use]
pub fn delivery_time_remaining(expected: DateTime<Utc>, now: DateTime<Utc>) -> DeliveryCountdown {
    let left = expected - now;
    if left <= chrono::Duration::zero() {
        DeliveryCountdown::Overdue
    } else if left < chrono::Duration::hours(24) {
        DeliveryCountdown::Hours(left.num_hours().max(1))
    } else {
        DeliveryCountdown::Days(left.num_days())
    }
}
