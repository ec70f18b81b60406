//! Checkout orchestration.
//!
//! [`CheckoutService`] runs the core checkout rules against live backend
//! data: it fills in store details the cart lacks, gathers the promotions a
//! code can be matched against, prices shipping from each store's province,
//! places the order, and starts the gateway payment when one is needed.

use std::collections::HashMap;

use chrono::Utc;
use marketplace_core::address::Address;
use marketplace_core::cart::{self, CartLine, ResolvedStore, StoreGroup};
use marketplace_core::checkout::{CheckoutDraft, CheckoutQuote};
use marketplace_core::pagination::PageRequest;
use marketplace_core::payment::{MomoPaymentRequest, PaymentRedirect, VnpayPaymentRequest};
use marketplace_core::promotion::{AppliedPromotion, PromotionCatalog};
use marketplace_core::{OrderId, PaymentMethod, StoreId, VariantId, Vnd};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::client::ApiClient;
use crate::error::ApiError;

/// Promotions fetched per list when matching a code.
pub const PROMOTION_PAGE_SIZE: u32 = 20;

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    /// One order per store.
    pub order_ids: Vec<OrderId>,
    pub quote: CheckoutQuote,
    /// Where to send the buyer; `None` for cash on delivery.
    pub payment: Option<PaymentRedirect>,
}

/// Which gateway a payment method goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gateway {
    Vnpay,
    Momo,
}

impl Gateway {
    const fn of(method: PaymentMethod) -> Option<Self> {
        match method {
            PaymentMethod::Vnpay | PaymentMethod::BankTransfer => Some(Self::Vnpay),
            PaymentMethod::Momo | PaymentMethod::EWallet => Some(Self::Momo),
            _ => None,
        }
    }
}

fn order_info(order_ids: &[OrderId]) -> String {
    let ids: Vec<&str> = order_ids.iter().map(OrderId::as_str).collect();
    format!("Thanh toán đơn hàng {}", ids.join(", "))
}

/// Checkout flow for the signed-in buyer.
#[derive(Clone)]
pub struct CheckoutService {
    client: ApiClient,
}

impl CheckoutService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The cart lines the buyer selected for checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be fetched.
    #[instrument(skip(self))]
    pub async fn load_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        let cart = self.client.cart().await?;
        Ok(cart.selected_lines())
    }

    /// Look up store details for lines that arrived without any.
    ///
    /// Lookups that fail are logged and left out; those lines fall back to an
    /// unnamed store group.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn resolve_stores(&self, lines: &[CartLine]) -> HashMap<VariantId, ResolvedStore> {
        let mut resolved = HashMap::new();
        for variant in cart::variants_missing_store(lines) {
            match self.client.variant(&variant).await {
                Ok(details) => {
                    resolved.insert(variant, details.resolved_store());
                }
                Err(e) => {
                    warn!(variant_id = %variant, error = %e, "Could not resolve store for variant");
                }
            }
        }
        resolved
    }

    /// Lines split into store parcels, with missing store details filled in.
    pub async fn store_groups(&self, lines: &[CartLine]) -> Vec<StoreGroup> {
        let resolved = self.resolve_stores(lines).await;
        cart::group_by_store(lines, &resolved)
    }

    /// Platform promotions, plus the store's own when the cart has a single
    /// store.
    ///
    /// # Errors
    ///
    /// Returns transport and status errors from either list.
    #[instrument(skip(self), fields(order_total = %order_total))]
    pub async fn promotion_catalog(
        &self,
        order_total: Vnd,
        primary_store: Option<&StoreId>,
    ) -> Result<PromotionCatalog, ApiError> {
        let page = PageRequest::new(0, PROMOTION_PAGE_SIZE);
        let platform = self.client.platform_promotions(order_total, &page).await?;
        let catalog = PromotionCatalog::new(platform.content);
        let Some(store) = primary_store else {
            return Ok(catalog);
        };
        let store_promotions = self
            .client
            .store_promotions(store, order_total, &page)
            .await?;
        Ok(catalog.with_store(store.clone(), store_promotions.content))
    }

    /// Match a code against the catalog and price it.
    ///
    /// # Errors
    ///
    /// `ApiError::Promotion` with the reason the code was refused.
    pub fn apply_code(
        catalog: &PromotionCatalog,
        code: &str,
        order_total: Vnd,
    ) -> Result<AppliedPromotion, ApiError> {
        let applied = AppliedPromotion::apply(catalog, code, order_total, Utc::now())?;
        info!(code = %applied.code, discount = %applied.discount, "Promotion applied");
        Ok(applied)
    }

    /// Provinces of the given stores. Stores that cannot be fetched, or list
    /// no province, are left out and ship at the flat fee.
    async fn store_provinces(&self, groups: &[StoreGroup]) -> HashMap<StoreId, String> {
        let mut provinces = HashMap::new();
        for id in groups.iter().filter_map(|g| g.store_id.as_ref()) {
            if provinces.contains_key(id) {
                continue;
            }
            match self.client.store(id).await {
                Ok(store) => {
                    if let Some(province) = store.province() {
                        provinces.insert(id.clone(), province.to_owned());
                    }
                }
                Err(e) => warn!(store_id = %id, error = %e, "Could not fetch store province"),
            }
        }
        provinces
    }

    /// Price breakdown for the lines shipped to `address`.
    #[instrument(skip_all, fields(lines = lines.len(), discount = %discount))]
    pub async fn quote(&self, lines: &[CartLine], address: Option<&Address>, discount: Vnd) -> CheckoutQuote {
        let groups = self.store_groups(lines).await;
        let provinces = self.store_provinces(&groups).await;
        let destination = address.map(|a| a.province.as_str());
        CheckoutQuote::for_groups(&groups, &provinces, destination, discount)
    }

    /// Place the order and start the payment.
    ///
    /// # Errors
    ///
    /// `ApiError::Checkout` when the draft is incomplete; otherwise the first
    /// failing backend call. A payment failure after the orders exist is
    /// returned as an error; the orders stay pending and can be paid later.
    #[instrument(skip_all, fields(lines = draft.lines.len(), payment = ?draft.payment_method))]
    pub async fn place_order(&self, draft: &CheckoutDraft) -> Result<PlacedOrder, ApiError> {
        let request = draft.build_request()?;
        let quote = self
            .quote(&draft.lines, draft.address.as_ref(), draft.discount())
            .await;

        let order_ids = self.client.checkout_order(&request).await?;
        let payment = match Gateway::of(request.payment_method) {
            None => None,
            Some(gateway) => Some(
                self.start_payment(gateway, request.payment_method, &order_ids, quote.final_total)
                    .await
                    .inspect_err(|e| {
                        error!(orders = ?order_ids, error = %e, "Orders created but payment could not start");
                    })?,
            ),
        };

        info!(orders = order_ids.len(), total = %quote.final_total, "Checkout complete");
        Ok(PlacedOrder {
            order_ids,
            quote,
            payment,
        })
    }

    async fn start_payment(
        &self,
        gateway: Gateway,
        method: PaymentMethod,
        order_ids: &[OrderId],
        amount: Vnd,
    ) -> Result<PaymentRedirect, ApiError> {
        if order_ids.is_empty() {
            return Err(ApiError::Backend(
                "Không nhận được mã đơn hàng từ server".to_owned(),
            ));
        }
        let url = match gateway {
            Gateway::Vnpay => {
                let request = VnpayPaymentRequest::new(amount, order_info(order_ids))?;
                self.client.create_vnpay_payment(&request).await?
            }
            Gateway::Momo => {
                let request = MomoPaymentRequest::new(amount, order_ids.to_vec())?;
                self.client.create_momo_payment(&request).await?.pay_url
            }
        };
        Ok(PaymentRedirect { method, url })
    }
}
