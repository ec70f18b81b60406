//! Shipping quotes and the shipper workflow.

use marketplace_core::ShipmentId;
use marketplace_core::shipment::Shipment;
use marketplace_core::shipping::{self, ShippingQuote};
use marketplace_storefront::ApiError;
use marketplace_storefront::services::shipper::ShipperStep;
use rust_decimal::Decimal;

use super::{CliError, Context, out};

fn print_quote(from: &str, to: &str, quote: &ShippingQuote) {
    out(format!("{from} → {to}"));
    out(format!("  Tuyến: {}", quote.tier.label()));
    out(format!("  Phí vận chuyển: {}", quote.fee));
    out(format!(
        "  Thời gian giao: {}-{} ngày",
        quote.delivery_days.start(),
        quote.delivery_days.end()
    ));
}

/// Quote by province code or name. Without a province file the names are
/// used as given.
pub async fn quote(ctx: &Context, from: &str, to: &str, weight: Decimal) -> Result<(), CliError> {
    let (from, to, quote) = match ctx.client.province_directory().await {
        Ok(directory) => (
            directory.name_of(from).to_owned(),
            directory.name_of(to).to_owned(),
            directory.quote(from, to, weight),
        ),
        Err(ApiError::Validation(reason)) => {
            tracing::debug!(%reason, "No province file, using names as given");
            (
                from.to_owned(),
                to.to_owned(),
                shipping::estimate(Some(from), Some(to), weight),
            )
        }
        Err(e) => return Err(e.into()),
    };
    print_quote(&from, &to, &quote);
    Ok(())
}

fn print_shipment(shipment: &Shipment) {
    let order = shipment.order_id.as_ref().map_or("-", |id| id.as_str());
    let to = shipment
        .delivery_address
        .as_ref()
        .map(|a| a.province.as_str())
        .unwrap_or_default();
    out(format!(
        "{}  đơn {order}  {}  {to}",
        shipment.id,
        shipment.status.label()
    ));
}

pub async fn ready(ctx: &Context) -> Result<(), CliError> {
    let shipments = ctx.client.ready_to_pickup().await?;
    if shipments.is_empty() {
        out("Không có đơn chờ lấy");
    }
    shipments.iter().for_each(print_shipment);
    Ok(())
}

pub async fn advance(ctx: &Context, id: &str, step: ShipperStep) -> Result<(), CliError> {
    let shipment = ctx
        .client
        .advance_shipment(&ShipmentId::new(id), step)
        .await?;
    print_shipment(&shipment);
    Ok(())
}

pub async fn fail(ctx: &Context, id: &str, reason: &str) -> Result<(), CliError> {
    let shipment = ctx
        .client
        .fail_shipment(&ShipmentId::new(id), reason)
        .await?;
    print_shipment(&shipment);
    Ok(())
}
