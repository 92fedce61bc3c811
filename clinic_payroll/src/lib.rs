//! Clinic payroll library crate.
//!
//! This crate computes monthly payroll for skincare-clinic staff: a
//! fixed base pay plus a cascade of conditional bonuses evaluated from
//! the period's sales and consumption figures.  External applications
//! may call [`engine::run_payroll`] directly, feed it through a
//! [`provider::MetricsProvider`], or embed the API via
//! [`api::build_router`].

pub mod api;
pub mod bonus;
pub mod engine;
pub mod error;
pub mod models;
pub mod provider;
pub mod report;
pub mod rules;
pub mod settings;
pub mod telemetry;
