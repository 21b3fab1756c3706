//! Core domain entities.
//!
//! Decimal-sensitive fields (price, size, liquidity, NAV) are carried as
//! `String` end-to-end and parsed only inside comparators/aggregators,
//! the same convention `Order { price: String, size: String }` uses
//! elsewhere in this codebase.

pub mod candle;
pub mod document;
pub mod fact;
pub mod instrument;
pub mod market;
pub mod metric;
pub mod orderbook;
pub mod signal;

pub use candle::*;
pub use document::*;
pub use fact::*;
pub use instrument::*;
pub use market::*;
pub use metric::*;
pub use orderbook::*;
pub use signal::*;

/// Parse a decimal string to f64, returning `None` rather than defaulting
/// to zero — nullable numeric inputs must not silently become zero.
pub fn parse_decimal(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}
