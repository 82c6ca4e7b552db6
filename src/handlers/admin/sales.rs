use std::collections::BTreeMap;

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::SaleWithProduct;

#[derive(Debug, Deserialize)]
pub struct SalesReportQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "30days".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReportResponse {
    pub stats: SalesStats,
    pub chart_data: Vec<ChartPoint>,
    pub recent_sales: Vec<RecentSale>,
}

/// Monetary figures are reported in major units (dollars, not cents).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_revenue: f64,
    pub total_sales: usize,
    pub regular_sales: usize,
    pub extended_sales: usize,
    pub average_order_value: f64,
}

#[derive(Debug, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub count: usize,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSale {
    pub id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub amount: f64,
    pub license_type: String,
    pub license_key: String,
    pub created_at: i64,
}

const RECENT_SALES_LIMIT: usize = 10;

fn period_start(period: &str, now: i64) -> Result<i64> {
    let days = match period {
        "7days" => 7,
        "30days" => 30,
        "90days" => 90,
        "year" => 365,
        "all" => return Ok(0),
        _ => return Err(AppError::BadRequest("Unknown report period".into())),
    };
    Ok(now - days * 86400)
}

fn day_bucket(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string())
}

/// GET /admin/sales?period= - revenue stats, per-day chart, recent sales.
pub async fn sales_report(
    State(state): State<AppState>,
    Query(query): Query<SalesReportQuery>,
) -> Result<Json<SalesReportResponse>> {
    let since = period_start(&query.period, Utc::now().timestamp())?;

    let conn = state.db.get()?;
    let sales = queries::list_completed_sales_since(&conn, since)?;

    let total_cents: i64 = sales.iter().map(|s| s.sale.amount_cents).sum();
    let total_sales = sales.len();
    let regular_sales = count_tier(&sales, "regular");
    let extended_sales = count_tier(&sales, "extended");

    // BTreeMap keeps the chart in date order.
    let mut by_day: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    for sale in &sales {
        let entry = by_day.entry(day_bucket(sale.sale.created_at)).or_default();
        entry.0 += 1;
        entry.1 += sale.sale.amount_cents;
    }
    let chart_data = by_day
        .into_iter()
        .map(|(date, (count, cents))| ChartPoint {
            date,
            count,
            revenue: cents as f64 / 100.0,
        })
        .collect();

    let recent_sales = sales
        .iter()
        .take(RECENT_SALES_LIMIT)
        .map(|s| RecentSale {
            id: s.sale.id.clone(),
            customer_email: s.sale.customer_email.clone(),
            customer_name: s.sale.customer_name.clone(),
            amount: s.sale.amount_cents as f64 / 100.0,
            license_type: s.product.license_type.clone(),
            license_key: s.sale.license_key.clone(),
            created_at: s.sale.created_at,
        })
        .collect();

    Ok(Json(SalesReportResponse {
        stats: SalesStats {
            total_revenue: total_cents as f64 / 100.0,
            total_sales,
            regular_sales,
            extended_sales,
            average_order_value: if total_sales > 0 {
                (total_cents as f64 / total_sales as f64) / 100.0
            } else {
                0.0
            },
        },
        chart_data,
        recent_sales,
    }))
}

fn count_tier(sales: &[SaleWithProduct], tier: &str) -> usize {
    sales
        .iter()
        .filter(|s| s.product.license_type == tier)
        .count()
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub success: bool,
    pub message: String,
}

/// POST /admin/sales/{id}/refund - completed -> refunded.
///
/// Only flips local state; the money movement happens in the payment
/// provider's dashboard, and the charge.refunded webhook converges the two
/// when the order is reversed.
pub async fn refund_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
) -> Result<Json<RefundResponse>> {
    let conn = state.db.get()?;

    let sale = queries::get_sale_by_id(&conn, &sale_id)?
        .ok_or_else(|| AppError::NotFound("Sale not found".into()))?;

    if !queries::mark_sale_refunded(&conn, &sale.id)? {
        return Err(AppError::BadRequest(
            "Only completed sales can be refunded".into(),
        ));
    }

    tracing::info!(sale_id = %sale.id, license_key = %sale.license_key, "Sale refunded");

    Ok(Json(RefundResponse {
        success: true,
        message: "Sale marked as refunded".to_string(),
    }))
}
