//! Shared helpers for Decimal ↔ f64 conversions.
//!
//! Weather measurements are stored as NUMERIC and held as `Decimal` in the
//! record types. Provider values are rounded to 1 decimal place at parse
//! time; responses convert back to f64 at the serialization boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert an f64 to Decimal, rounded to 1 decimal place.
///
/// 0.1°C / 0.1 m/s precision is sufficient for weather values, and rounding
/// once at parse time keeps cached rows and fresh responses identical.
/// Returns `Decimal::ZERO` for non-finite inputs (NaN, ±Inf).
pub(crate) fn f64_to_decimal_1dp(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_1dp received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_str_exact(&format!("{:.1}", v)).unwrap_or_default()
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be
/// represented.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
