//! Checkout, buyer orders and notifications.

use marketplace_core::address::{Address, pick_default};
use marketplace_core::cart::{self, CartLine};
use marketplace_core::checkout::CheckoutDraft;
use marketplace_core::notification::NotificationQuery;
use marketplace_core::order::{Order, OrderQuery};
use marketplace_core::pagination::PageRequest;
use marketplace_core::{NotificationId, OrderId, OrderStatus, PaymentMethod, Vnd};
use marketplace_storefront::checkout::CheckoutService;
use marketplace_storefront::services::notifications::Inbox;

use super::{CliError, Context, out};

fn choose_address(addresses: Vec<Address>, wanted: Option<&str>) -> Result<Address, CliError> {
    match wanted {
        Some(id) => addresses
            .into_iter()
            .find(|a| a.id.as_ref().is_some_and(|a| a.as_str() == id))
            .ok_or_else(|| CliError::Usage(format!("Không tìm thấy địa chỉ {id}"))),
        None => pick_default(&addresses)
            .cloned()
            .ok_or_else(|| CliError::Usage("Vui lòng thêm địa chỉ giao hàng".to_owned())),
    }
}

fn payment_method(name: &str) -> Result<PaymentMethod, CliError> {
    match PaymentMethod::parse(name) {
        PaymentMethod::Unknown => Err(CliError::Usage(format!(
            "Phương thức thanh toán không hợp lệ: {name} (cod, vnpay, momo)"
        ))),
        method => Ok(method),
    }
}

pub async fn checkout(
    ctx: &Context,
    address: Option<&str>,
    payment: &str,
    code: Option<&str>,
    note: String,
) -> Result<(), CliError> {
    let payment_method = payment_method(payment)?;
    let service = CheckoutService::new(ctx.client.clone());

    let lines = service.load_cart().await?;
    let groups = service.store_groups(&lines).await;
    let primary_store = cart::primary_store(&groups).cloned();
    let address = choose_address(ctx.client.addresses().await?, address)?;
    let order_total: Vnd = lines.iter().map(CartLine::line_total).sum();

    let applied = match code {
        Some(code) => {
            let catalog = service
                .promotion_catalog(order_total, primary_store.as_ref())
                .await?;
            Some(CheckoutService::apply_code(&catalog, code, order_total)?)
        }
        None => None,
    };
    let customer_phone = ctx
        .client
        .session()
        .get()
        .await
        .and_then(|s| s.user.phone);

    let draft = CheckoutDraft {
        lines,
        address: Some(address),
        customer_phone,
        payment_method: Some(payment_method),
        note,
        applied,
        primary_store,
    };
    let placed = service.place_order(&draft).await?;

    let ids: Vec<&str> = placed.order_ids.iter().map(OrderId::as_str).collect();
    out(format!("Đặt hàng thành công: {}", ids.join(", ")));
    out(format!("  Tiền hàng:   {}", placed.quote.product_total));
    out(format!("  Giảm giá:    -{}", placed.quote.discount));
    out(format!("  Phí vận chuyển: {}", placed.quote.shipping_fee));
    out(format!("  Tổng cộng:   {}", placed.quote.final_total));
    if let Some(payment) = placed.payment {
        out(format!("Thanh toán tại: {}", payment.url));
    }
    Ok(())
}

fn print_order(order: &Order) {
    out(format!(
        "{}  {}  {}  {}",
        order.display_number(),
        order.status.label(),
        order.store_name.as_deref().unwrap_or_default(),
        order.total_price
    ));
}

pub async fn list(ctx: &Context, status: Option<&str>, page: u32) -> Result<(), CliError> {
    let mut query = OrderQuery {
        page: PageRequest {
            page,
            ..PageRequest::default()
        },
        status: None,
    };
    if let Some(status) = status {
        query = query.with_status(OrderStatus::parse(status));
    }
    let orders = ctx.client.buyer_orders(&query).await?;
    if orders.is_empty() {
        out("Chưa có đơn hàng");
    }
    orders.iter().for_each(print_order);
    Ok(())
}

pub async fn show(ctx: &Context, id: &str) -> Result<(), CliError> {
    let order = ctx.client.order(&OrderId::new(id)).await?;
    print_order(&order);
    for item in &order.items {
        out(format!(
            "  {} × {}  = {}",
            item.name,
            item.quantity,
            item.line_total()
        ));
    }
    out(format!("  Phí vận chuyển: {}", order.shipping_fee));
    if order.discount.is_positive() {
        out(format!("  Giảm giá: -{}", order.discount));
    }
    if let Some(reason) = &order.cancel_reason {
        out(format!("  Lý do hủy: {reason}"));
    }
    Ok(())
}

pub async fn cancel(ctx: &Context, id: &str, reason: &str) -> Result<(), CliError> {
    let id = OrderId::new(id);
    let order = ctx.client.order(&id).await?;
    if !order.status.can_cancel() {
        return Err(CliError::Usage(format!(
            "Không thể hủy đơn hàng ở trạng thái \"{}\"",
            order.status.label()
        )));
    }
    ctx.client.cancel_order(&id, reason).await?;
    out(format!("Đã hủy đơn hàng {}", order.display_number()));
    Ok(())
}

pub async fn notifications(ctx: &Context, unread_only: bool) -> Result<(), CliError> {
    let query = if unread_only {
        NotificationQuery::unread()
    } else {
        NotificationQuery::default()
    };
    let page = ctx.client.notifications(&Inbox::Buyer, &query).await?;
    for n in page.iter() {
        let marker = if n.is_read { ' ' } else { '•' };
        out(format!("{marker} {} {} [{}] {}", n.icon(), n.title, n.id, n.message));
    }
    let unread = ctx.client.unread_notifications(&Inbox::Buyer).await?;
    out(format!("{unread} thông báo chưa đọc"));
    Ok(())
}

pub async fn mark_read(ctx: &Context, id: &str) -> Result<(), CliError> {
    ctx.client
        .mark_notification_read(&Inbox::Buyer, &NotificationId::new(id))
        .await?;
    out("Đã đánh dấu đã đọc");
    Ok(())
}

pub async fn mark_all_read(ctx: &Context) -> Result<(), CliError> {
    ctx.client.mark_all_notifications_read(&Inbox::Buyer).await?;
    out("Đã đánh dấu tất cả đã đọc");
    Ok(())
}
