//! Catalog browsing and the cart.

use marketplace_core::cart::{Cart, CartOptions};
use marketplace_core::pagination::PageRequest;
use marketplace_core::{CartItemId, VariantId};
use marketplace_storefront::checkout::CheckoutService;
use marketplace_storefront::services::catalog::{CATALOG_PAGE_SIZE, CatalogQuery};

use super::{CliError, Context, out};

pub async fn products(
    ctx: &Context,
    category: Option<&str>,
    brand: Option<&str>,
    search: Option<String>,
    page: u32,
) -> Result<(), CliError> {
    let paging = PageRequest::new(page, CATALOG_PAGE_SIZE);
    let listing = match (category, brand, search) {
        (Some(category), Some(brand), _) => {
            ctx.client
                .products_by_category_and_brand(category, brand, &paging)
                .await?
        }
        (Some(category), None, _) => ctx.client.products_by_category(category, &paging).await?,
        (None, _, Some(name)) => ctx.client.products(&CatalogQuery::search(name).page(page)).await?,
        (None, _, None) => ctx.client.products(&CatalogQuery::default().page(page)).await?,
    };

    if listing.content.is_empty() {
        out("Không tìm thấy sản phẩm");
        return Ok(());
    }
    for product in &listing.content {
        let id = product.id.as_ref().map_or("-", |id| id.as_str());
        let store = product.store_name.as_deref().unwrap_or_default();
        out(format!("{id:>8}  {}  {store}", product.name));
    }
    out(format!(
        "Trang {}/{} ({} sản phẩm)",
        listing.number + 1,
        listing.total_pages.max(1),
        listing.total_elements
    ));
    Ok(())
}

fn print_summary(cart: &Cart) {
    out(format!(
        "Đã chọn {} sản phẩm, tạm tính {}",
        cart.selected_count(),
        cart.selected_total_price()
    ));
}

pub async fn show_cart(ctx: &Context) -> Result<(), CliError> {
    let cart = ctx.client.cart().await?;
    if cart.is_empty() {
        out("Giỏ hàng trống");
        return Ok(());
    }

    let groups = CheckoutService::new(ctx.client.clone())
        .store_groups(&cart.lines)
        .await;
    for group in &groups {
        out(format!("{} ({})", group.store_name, group.subtotal()));
        for line in &group.lines {
            let mark = if line.selected { 'x' } else { ' ' };
            out(format!(
                "  [{mark}] {}  {} × {}  = {}",
                line.id,
                line.product.name,
                line.quantity,
                line.line_total()
            ));
        }
    }
    print_summary(&cart);
    Ok(())
}

pub async fn add_to_cart(ctx: &Context, variant: &str, quantity: u32) -> Result<(), CliError> {
    let cart = ctx
        .client
        .add_to_cart(&VariantId::new(variant), quantity, &CartOptions::new())
        .await?;
    out("Đã thêm vào giỏ hàng");
    print_summary(&cart);
    Ok(())
}

pub async fn remove_from_cart(ctx: &Context, item: &str) -> Result<(), CliError> {
    let cart = ctx.client.remove_cart_item(&CartItemId::new(item)).await?;
    out("Đã xóa khỏi giỏ hàng");
    print_summary(&cart);
    Ok(())
}

pub async fn clear_cart(ctx: &Context) -> Result<(), CliError> {
    ctx.client.clear_cart().await?;
    out("Đã xóa toàn bộ giỏ hàng");
    Ok(())
}
