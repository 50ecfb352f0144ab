//! Dashboard analytics computed from all transactions on every request.

mod aggregation;
mod monthly;
mod overview;

pub use monthly::get_monthly_endpoint;
pub use overview::get_overview_endpoint;
