//! Investment Strategies
//!
//! Market-level classification and capital allocation.

mod allocation;
mod market;

pub use allocation::{AllocationPlan, Allocator};
pub use market::MarketClassifier;
