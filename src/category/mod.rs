//! Categories group transactions for budgeting and reporting.

mod create_endpoint;
mod db;
mod delete_endpoint;
mod domain;
mod edit_endpoint;
mod list_endpoint;

pub use create_endpoint::create_category_endpoint;
pub use db::{
    create_category, create_category_table, delete_category, get_all_categories,
    get_categories_with_stats, seed_default_categories, update_category_name,
};
pub use delete_endpoint::delete_category_endpoint;
pub use domain::{Category, CategoryStats, NewCategory};
pub use edit_endpoint::edit_category_endpoint;
pub use list_endpoint::{get_categories_endpoint, get_categories_with_stats_endpoint};
