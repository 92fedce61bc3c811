//! HTTP API for the payroll engine.
//!
//! This module exposes a minimal REST API around the engine using the
//! [`axum`](https://crates.io/crates/axum) framework.  Clients submit a
//! period's metrics and receive the payroll breakdown as JSON.  The
//! rule set is fixed when the router is built and shared read-only by
//! every request.

use crate::engine::run_payroll;
use crate::error::PayrollError;
use crate::models::{PayRunInput, PayRunResult};
use crate::rules::PayrollRules;
use crate::settings::AppSettings;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Application state shared across requests.
pub struct AppState {
    pub rules: PayrollRules,
}

/// Build the API router around `rules`.
pub fn build_router(rules: PayrollRules) -> Router {
    let state = Arc::new(AppState { rules });
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/rules", get(rules_handler))
        .route("/api/payroll", post(payroll_handler))
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Handler for GET /api/rules
async fn rules_handler(State(state): State<Arc<AppState>>) -> Json<PayrollRules> {
    Json(state.rules.clone())
}

/// Handler for POST /api/payroll
async fn payroll_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PayRunInput>,
) -> Result<Json<PayRunResult>, PayrollError> {
    let result = run_payroll(&input, &state.rules)?;
    Ok(Json(result))
}

/// Launch the API server and block until it terminates.
pub async fn serve(settings: &AppSettings, rules: PayrollRules) -> anyhow::Result<()> {
    let router = build_router(rules);
    let addr = settings.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "payroll server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmployeeMetrics, StoreMetrics};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use rust_decimal::Decimal;
    use std::collections::{BTreeSet, HashMap};

    fn state() -> State<Arc<AppState>> {
        State(Arc::new(AppState {
            rules: PayrollRules::default(),
        }))
    }

    fn input(revenue: i64) -> PayRunInput {
        PayRunInput {
            store: StoreMetrics {
                total_revenue: Decimal::from(600_000),
                total_consumption: Decimal::from(480_000),
            },
            employees: vec![EmployeeMetrics {
                identifier: "1".into(),
                name: "Amy".into(),
                personal_revenue: Decimal::from(revenue),
                personal_consumption: Decimal::from(100_000),
                visit_count: 120,
                new_customer_conversion_rate: Decimal::new(5, 1),
                skill_bonus_accrued: Decimal::from(900),
                advanced_course_bonus_accrued: Decimal::ZERO,
                product_sales_bonus_accrued: Decimal::ZERO,
                mask_sale_count: None,
            }],
            mask_sales: HashMap::new(),
            formal_staff: BTreeSet::from(["1".to_string()]),
            team_headcount: Some(2),
        }
    }

    #[tokio::test]
    async fn payroll_endpoint_returns_breakdown() {
        let Json(result) = payroll_handler(state(), Json(input(260_000)))
            .await
            .expect("payroll computed");
        assert_eq!(result.line_items.len(), 1);
        assert_eq!(result.team_bonus.amount, Decimal::from(5_000));
        assert_eq!(result.line_items[0].visit_count_bonus, Decimal::from(1_000));
    }

    #[tokio::test]
    async fn payroll_endpoint_rejects_invalid_metrics() {
        let err = payroll_handler(state(), Json(input(-1)))
            .await
            .expect_err("negative revenue rejected");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn payroll_endpoint_reports_overflow_as_unprocessable() {
        let mut input = input(260_000);
        input.employees[0].skill_bonus_accrued = Decimal::MAX;
        let err = payroll_handler(state(), Json(input))
            .await
            .expect_err("subtotal overflows");
        assert!(matches!(err, PayrollError::Overflow { .. }));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rules_endpoint_serves_current_rules() {
        let Json(rules) = rules_handler(state()).await;
        assert_eq!(rules, PayrollRules::default());
    }
}
