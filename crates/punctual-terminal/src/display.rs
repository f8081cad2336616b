//! Human-readable formatting for prices, positions and PnL.

use chrono::{DateTime, Utc};
use punctual_core::{OpenOrder, Pnl, Position, PriceChange, Scale};
use rust_decimal::Decimal;

/// Time since `opened_at`: "2h 5m ago", or "5m ago" under an hour.
pub fn format_elapsed(opened_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - opened_at).num_minutes().max(0);
    let hours = minutes / 60;
    if hours > 0 {
        format!("{hours}h {}m ago", minutes % 60)
    } else {
        format!("{minutes}m ago")
    }
}

/// Raw fixed-point amount with two decimals; zero prints as "0.00".
pub fn format_fixed(raw: u128, scale: Scale) -> punctual_core::Result<String> {
    if raw == 0 {
        return Ok("0.00".to_string());
    }
    Ok(format_decimal(scale.to_decimal(raw)?))
}

pub fn format_decimal(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

/// Signed percentage, e.g. "+1.25%".
pub fn format_percent(pct: f64) -> String {
    format!("{pct:+.2}%")
}

pub fn format_change(change: &PriceChange) -> String {
    format!(
        "spot {} | perp {}",
        format_percent(change.spot_pct),
        format_percent(change.perp_pct)
    )
}

pub fn format_pnl(pnl: &Pnl) -> String {
    format!("{:+.4} ({})", pnl.pnl, format_percent(pnl.pnl_percent))
}

/// Size and liquidation estimate shown before an order is submitted.
pub fn order_preview(order: &OpenOrder, current_price: Option<f64>) -> String {
    let liquidation = current_price
        .filter(|price| price.is_finite() && *price > 0.0)
        .and_then(|price| Decimal::try_from(price).ok())
        .map_or_else(
            || "waiting for price".to_string(),
            |price| format_decimal(order.liquidation_price(price)),
        );
    format!(
        "{} {}x\n  size      {}\n  est. liq  {}",
        order.direction,
        order.leverage,
        format_decimal(order.position_size()),
        liquidation
    )
}

/// Multi-line position summary for the terminal.
pub fn position_summary(
    position: &Position,
    current_price: Option<f64>,
    now: DateTime<Utc>,
) -> String {
    if !position.is_open() {
        return "No open position".to_string();
    }

    let mut lines = vec![
        format!("{} {}x", position.direction, position.leverage),
        format!("  entry     {}", format_decimal(position.entry_price)),
        format!("  margin    {}", format_decimal(position.margin)),
        format!("  size      {}", format_decimal(position.size)),
        format!("  quantity  {}", position.quantity.normalize()),
        format!("  opened    {}", format_elapsed(position.opened_at, now)),
    ];
    match current_price {
        Some(price) => {
            let pnl = position.unrealized_pnl(price);
            lines.push(format!("  price     {}", format_price(price)));
            lines.push(format!("  pnl       {}", format_pnl(&pnl)));
        }
        None => lines.push("  pnl       waiting for price".to_string()),
    }
    lines.join("\n")
}
