//! Shopping cart lines, totals, and per-store grouping.
//!
//! A cart line is keyed by its variant plus the chosen options, so the same
//! variant in two colours is two lines. The backend cart endpoint returns its
//! own shape ([`normalize_backend_lines`] converts it). Lines may lack store
//! information entirely; checkout asks the variant endpoint for the owning
//! store and feeds the answers back into [`group_by_store`] as overrides.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::time::opt_timestamp;
use crate::types::{CartItemId, StoreId, VariantId, Vnd};

/// Chosen options (colour, size, ...), sorted by key.
pub type CartOptions = BTreeMap<String, String>;

/// Errors from cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Số lượng phải lớn hơn 0")]
    ZeroQuantity,

    #[error("Không tìm thấy sản phẩm {0} trong giỏ hàng")]
    LineNotFound(CartItemId),
}

/// Line id for a variant with the given options.
///
/// `{variant}-{k1:v1|k2:v2}`, or `{variant}-no-options` when there are none.
#[must_use]
pub fn line_id(variant: &VariantId, options: &CartOptions) -> CartItemId {
    if options.is_empty() {
        return CartItemId::new(format!("{variant}-no-options"));
    }
    let rendered = options
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("|");
    CartItemId::new(format!("{variant}-{rendered}"))
}

/// Store reference nested in product payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRef {
    #[serde(default)]
    pub id: Option<StoreId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
}

impl StoreRef {
    fn display_name(&self) -> Option<&str> {
        nonblank(self.store_name.as_deref()).or_else(|| nonblank(self.name.as_deref()))
    }
}

/// The product shown on a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProduct {
    pub id: VariantId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_vnd")]
    pub price: Vnd,
    #[serde(default, deserialize_with = "lenient_opt_vnd")]
    pub original_price: Option<Vnd>,
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub store: Option<StoreRef>,
}

impl LineProduct {
    #[must_use]
    pub fn new(id: impl Into<VariantId>, name: impl Into<String>, price: Vnd) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: None,
            price,
            original_price: None,
            store_id: None,
            store_name: None,
            store: None,
        }
    }

    #[must_use]
    pub fn in_store(mut self, store_id: impl Into<StoreId>, store_name: impl Into<String>) -> Self {
        self.store_id = Some(store_id.into());
        self.store_name = Some(store_name.into());
        self
    }
}

/// Prices sometimes arrive pre-formatted (`"150.000đ"`); keep the digits.
fn parse_lenient(value: &Value) -> Option<Vnd> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Vnd::new)
            .or_else(|| n.as_f64().and_then(|f| serde_json::from_value(Value::from(f)).ok())),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse::<i64>().ok().map(Vnd::new)
        }
        _ => None,
    }
}

fn lenient_vnd<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vnd, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(parse_lenient(&value).unwrap_or_default())
}

fn lenient_opt_vnd<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vnd>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(parse_lenient(&value).filter(|v| v.is_positive()))
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    #[serde(rename = "productVariantId")]
    pub variant_id: VariantId,
    pub product: LineProduct,
    pub quantity: u32,
    #[serde(default)]
    pub options: CartOptions,
    #[serde(default = "default_selected")]
    pub selected: bool,
    #[serde(default, with = "opt_timestamp")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub store: Option<StoreRef>,
}

const fn default_selected() -> bool {
    true
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Vnd {
        self.product.price.times(self.quantity)
    }

    /// Savings against the original price, if any.
    #[must_use]
    pub fn savings(&self) -> Vnd {
        self.product
            .original_price
            .map_or(Vnd::ZERO, |orig| orig.saturating_sub(self.product.price).times(self.quantity))
    }

    /// Colour option sent with checkout items.
    #[must_use]
    pub fn color_id(&self) -> Option<&str> {
        self.options
            .get("colorId")
            .or_else(|| self.options.get("color"))
            .map(String::as_str)
    }

    fn store_id_candidates(&self) -> impl Iterator<Item = &StoreId> {
        [
            self.product.store_id.as_ref(),
            self.product.store.as_ref().and_then(|s| s.id.as_ref()),
            self.store_id.as_ref(),
            self.store.as_ref().and_then(|s| s.id.as_ref()),
        ]
        .into_iter()
        .flatten()
    }

    fn store_name_candidates(&self) -> impl Iterator<Item = &str> {
        [
            nonblank(self.product.store_name.as_deref()),
            self.product.store.as_ref().and_then(StoreRef::display_name),
            nonblank(self.store_name.as_deref()),
            self.store.as_ref().and_then(StoreRef::display_name),
        ]
        .into_iter()
        .flatten()
    }

    /// Whether any store id or name is known for this line.
    #[must_use]
    pub fn has_store_info(&self) -> bool {
        self.store_id_candidates().next().is_some() || self.store_name_candidates().next().is_some()
    }
}

fn nonblank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// The buyer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &CartItemId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.id == id)
    }

    fn get_mut(&mut self, id: &CartItemId) -> Result<&mut CartLine, CartError> {
        self.lines
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| CartError::LineNotFound(id.clone()))
    }

    /// Add a product, merging into an existing line with the same options.
    ///
    /// # Errors
    ///
    /// [`CartError::ZeroQuantity`] when `quantity` is zero.
    pub fn add(
        &mut self,
        product: LineProduct,
        quantity: u32,
        options: CartOptions,
        now: DateTime<Utc>,
    ) -> Result<&CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let id = line_id(&product.id, &options);
        if let Some(idx) = self.lines.iter().position(|l| l.id == id) {
            let line = &mut self.lines[idx];
            line.quantity = line.quantity.saturating_add(quantity);
            return Ok(&self.lines[idx]);
        }
        self.lines.push(CartLine {
            id,
            variant_id: product.id.clone(),
            product,
            quantity,
            options,
            selected: true,
            added_at: Some(now),
            store_id: None,
            store_name: None,
            store: None,
        });
        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// [`CartError::LineNotFound`] for an unknown line.
    pub fn set_quantity(&mut self, id: &CartItemId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(id).map(|_| ());
        }
        self.get_mut(id)?.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// [`CartError::LineNotFound`] for an unknown line.
    pub fn remove(&mut self, id: &CartItemId) -> Result<CartLine, CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| CartError::LineNotFound(id.clone()))?;
        Ok(self.lines.remove(idx))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// # Errors
    ///
    /// [`CartError::LineNotFound`] for an unknown line.
    pub fn toggle_selected(&mut self, id: &CartItemId) -> Result<bool, CartError> {
        let line = self.get_mut(id)?;
        line.selected = !line.selected;
        Ok(line.selected)
    }

    /// # Errors
    ///
    /// [`CartError::LineNotFound`] for an unknown line.
    pub fn set_selected(&mut self, id: &CartItemId, selected: bool) -> Result<(), CartError> {
        self.get_mut(id)?.selected = selected;
        Ok(())
    }

    pub fn select_all(&mut self, selected: bool) {
        for line in &mut self.lines {
            line.selected = selected;
        }
    }

    /// Drop selected lines (after they were ordered) and return them.
    pub fn remove_selected(&mut self) -> Vec<CartLine> {
        let (taken, kept) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|l| l.selected);
        self.lines = kept;
        taken
    }

    pub fn selected(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|l| l.selected)
    }

    #[must_use]
    pub fn selected_lines(&self) -> Vec<CartLine> {
        self.selected().cloned().collect()
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn total_price(&self) -> Vnd {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn total_savings(&self) -> Vnd {
        self.lines.iter().map(CartLine::savings).sum()
    }

    /// Units across selected lines.
    #[must_use]
    pub fn selected_count(&self) -> u32 {
        self.selected().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn selected_total_price(&self) -> Vnd {
        self.selected().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn selected_total_savings(&self) -> Vnd {
        self.selected().map(CartLine::savings).sum()
    }

    #[must_use]
    pub fn contains(&self, variant: &VariantId, options: &CartOptions) -> bool {
        self.get(&line_id(variant, options)).is_some()
    }

    #[must_use]
    pub fn quantity_of(&self, variant: &VariantId, options: &CartOptions) -> u32 {
        self.get(&line_id(variant, options)).map_or(0, |l| l.quantity)
    }
}

fn string_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match item.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn option_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert the backend cart payload into cart lines.
///
/// Accepts a bare array or `{ "cartItems": [...] }`. Items without a variant
/// id or a name are dropped. Every line starts selected.
#[must_use]
pub fn normalize_backend_lines(payload: &Value) -> Vec<CartLine> {
    let items = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => obj
            .get("cartItems")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice),
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| {
            let variant = VariantId::new(string_field(item, &["productVariantId", "productId"])?);
            let name = string_field(item, &["productVariantName", "productName", "name"])?;

            let store: Option<StoreRef> = item
                .get("store")
                .filter(|s| s.is_object())
                .and_then(|s| serde_json::from_value(s.clone()).ok());
            let store_id = string_field(item, &["storeId"])
                .map(StoreId::new)
                .or_else(|| store.as_ref().and_then(|s| s.id.clone()));

            let options: CartOptions = item
                .get("options")
                .and_then(Value::as_object)
                .map(|o| o.iter().map(|(k, v)| (k.clone(), option_value(v))).collect())
                .unwrap_or_default();

            let quantity = item
                .get("quantity")
                .and_then(Value::as_u64)
                .and_then(|q| u32::try_from(q).ok())
                .filter(|&q| q > 0)
                .unwrap_or(1);

            let product = LineProduct {
                id: variant.clone(),
                name,
                image: string_field(item, &["imageUrl", "image"]),
                price: item.get("price").and_then(parse_lenient).unwrap_or_default(),
                original_price: item
                    .get("originalPrice")
                    .and_then(parse_lenient)
                    .filter(|v| v.is_positive()),
                store_id,
                store_name: string_field(item, &["storeName"]),
                store,
            };

            let id = string_field(item, &["id"])
                .map_or_else(|| line_id(&variant, &options), CartItemId::new);

            Some(CartLine {
                id,
                variant_id: variant,
                product,
                quantity,
                options,
                selected: true,
                added_at: item
                    .get("createdAt")
                    .and_then(Value::as_str)
                    .and_then(crate::types::time::parse_timestamp),
                store_id: None,
                store_name: None,
                store: None,
            })
        })
        .collect()
}

/// Store details looked up for a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStore {
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
}

/// Cart lines belonging to one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreGroup {
    pub store_id: Option<StoreId>,
    pub store_name: String,
    pub lines: Vec<CartLine>,
}

impl StoreGroup {
    #[must_use]
    pub fn subtotal(&self) -> Vnd {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn units(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Display name for a store we only know by id (or not at all).
#[must_use]
pub fn fallback_store_name(store_id: Option<&StoreId>) -> String {
    store_id.map_or_else(
        || "Cửa hàng chưa xác định".to_owned(),
        |id| format!("Cửa hàng #{}", id.short()),
    )
}

/// Split lines by store, keeping first-seen order.
///
/// `resolved` holds store details fetched for variants whose lines carried
/// none; it takes precedence over anything on the line.
#[must_use]
pub fn group_by_store(
    lines: &[CartLine],
    resolved: &HashMap<VariantId, ResolvedStore>,
) -> Vec<StoreGroup> {
    let mut groups: Vec<StoreGroup> = Vec::new();

    for line in lines {
        let override_ = resolved.get(&line.variant_id);
        let store_id = override_
            .and_then(|r| r.store_id.clone())
            .or_else(|| line.store_id_candidates().next().cloned());
        let store_name = override_
            .and_then(|r| nonblank(r.store_name.as_deref()))
            .or_else(|| line.store_name_candidates().next())
            .map_or_else(|| fallback_store_name(store_id.as_ref()), ToOwned::to_owned);

        let existing = groups.iter_mut().find(|g| match (&g.store_id, &store_id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => g.store_name == store_name,
            _ => false,
        });
        match existing {
            Some(group) => group.lines.push(line.clone()),
            None => groups.push(StoreGroup {
                store_id,
                store_name,
                lines: vec![line.clone()],
            }),
        }
    }

    groups
}

/// The only store in the order, if there is exactly one.
#[must_use]
pub fn primary_store(groups: &[StoreGroup]) -> Option<&StoreId> {
    match groups {
        [only] => only.store_id.as_ref(),
        _ => None,
    }
}

/// Variants whose lines carry no store information, without duplicates.
#[must_use]
pub fn variants_missing_store(lines: &[CartLine]) -> Vec<VariantId> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .filter(|l| !l.has_store_info())
        .filter(|l| seen.insert(l.variant_id.clone()))
        .map(|l| l.variant_id.clone())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn opts(pairs: &[(&str, &str)]) -> CartOptions {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_line_id_sorts_options() {
        let v = VariantId::new("v1");
        assert_eq!(line_id(&v, &CartOptions::new()).as_str(), "v1-no-options");
        assert_eq!(
            line_id(&v, &opts(&[("size", "M"), ("color", "red")])).as_str(),
            "v1-color:red|size:M"
        );
    }

    #[test]
    fn test_add_merges_same_options() {
        let mut cart = Cart::default();
        let shirt = LineProduct::new("v1", "Áo", Vnd::new(100_000));
        cart.add(shirt.clone(), 1, opts(&[("color", "red")]), now()).unwrap();
        cart.add(shirt.clone(), 2, opts(&[("color", "red")]), now()).unwrap();
        cart.add(shirt, 1, opts(&[("color", "blue")]), now()).unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_price(), Vnd::new(400_000));
        assert_eq!(cart.quantity_of(&VariantId::new("v1"), &opts(&[("color", "red")])), 3);
        assert_eq!(
            cart.add(LineProduct::new("v2", "x", Vnd::ZERO), 0, CartOptions::new(), now()),
            Err(CartError::ZeroQuantity)
        );
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        let id = cart
            .add(LineProduct::new("v1", "Áo", Vnd::new(10)), 1, CartOptions::new(), now())
            .unwrap()
            .id
            .clone();
        cart.set_quantity(&id, 5).unwrap();
        assert_eq!(cart.total_items(), 5);
        cart.set_quantity(&id, 0).unwrap();
        assert!(cart.is_empty());
        assert!(matches!(cart.set_quantity(&id, 1), Err(CartError::LineNotFound(_))));
    }

    #[test]
    fn test_selection_totals() {
        let mut cart = Cart::default();
        cart.add(LineProduct::new("a", "A", Vnd::new(100)), 2, CartOptions::new(), now()).unwrap();
        cart.add(LineProduct::new("b", "B", Vnd::new(50)), 1, CartOptions::new(), now()).unwrap();
        let b = CartItemId::new("b-no-options");

        assert!(!cart.toggle_selected(&b).unwrap());
        assert_eq!(cart.selected_total_price(), Vnd::new(200));
        assert_eq!(cart.selected_count(), 2);

        cart.select_all(true);
        assert_eq!(cart.selected_total_price(), Vnd::new(250));

        cart.set_selected(&b, false).unwrap();
        let ordered = cart.remove_selected();
        assert_eq!(ordered.len(), 1);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].id, b);
    }

    #[test]
    fn test_savings() {
        let mut product = LineProduct::new("a", "A", Vnd::new(80));
        product.original_price = Some(Vnd::new(100));
        let mut cart = Cart::default();
        cart.add(product, 3, CartOptions::new(), now()).unwrap();
        assert_eq!(cart.total_savings(), Vnd::new(60));
    }

    #[test]
    fn test_normalize_backend_lines() {
        let payload = json!({
            "cartItems": [
                {"id": 11, "productVariantId": "v1", "productVariantName": "Áo thun",
                 "imageUrl": "a.png", "quantity": 2, "price": 150000, "storeId": "s1"},
                {"id": 12, "productId": "v2", "name": "Quần", "price": "200.000đ",
                 "store": {"id": "s2", "storeName": "Shop B"}},
                {"id": 13, "productVariantName": "no variant"},
                {"id": 14, "productVariantId": "v3"},
            ]
        });
        let lines = normalize_backend_lines(&payload);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].id.as_str(), "11");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].product.store_id, Some(StoreId::new("s1")));
        assert_eq!(lines[1].product.price, Vnd::new(200_000));
        assert_eq!(lines[1].quantity, 1);
        assert_eq!(lines[1].product.store_id, Some(StoreId::new("s2")));
        assert!(lines.iter().all(|l| l.selected));

        let bare = normalize_backend_lines(&json!([{"productVariantId": 7, "productName": "X"}]));
        assert_eq!(bare[0].variant_id.as_str(), "7");
        assert_eq!(bare[0].id.as_str(), "7-no-options");
        assert!(normalize_backend_lines(&json!({"unexpected": true})).is_empty());
    }

    fn line(variant: &str, product: LineProduct) -> CartLine {
        let mut cart = Cart::default();
        let mut product = product;
        product.id = VariantId::new(variant);
        cart.add(product, 1, CartOptions::new(), now()).unwrap();
        cart.lines.remove(0)
    }

    #[test]
    fn test_group_by_store_with_fallbacks() {
        let lines = vec![
            line("v1", LineProduct::new("", "A", Vnd::new(10)).in_store("store-000123", "Shop A")),
            line("v2", LineProduct::new("", "B", Vnd::new(20))),
            line("v3", LineProduct::new("", "C", Vnd::new(30)).in_store("store-000123", "")),
            line("v4", LineProduct::new("", "D", Vnd::new(40))),
        ];

        assert_eq!(
            variants_missing_store(&lines),
            vec![VariantId::new("v2"), VariantId::new("v4")]
        );

        let mut resolved = HashMap::new();
        resolved.insert(
            VariantId::new("v2"),
            ResolvedStore {
                store_id: Some(StoreId::new("abcdef987654")),
                store_name: None,
            },
        );

        let groups = group_by_store(&lines, &resolved);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].store_name, "Shop A");
        assert_eq!(groups[0].lines.len(), 2);
        assert_eq!(groups[0].subtotal(), Vnd::new(40));
        assert_eq!(groups[1].store_name, "Cửa hàng #987654");
        assert_eq!(groups[2].store_name, "Cửa hàng chưa xác định");
        assert!(primary_store(&groups).is_none());
        assert_eq!(primary_store(&groups[..1]), Some(&StoreId::new("store-000123")));
    }
}
