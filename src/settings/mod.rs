//! Key-value settings for each user, such as the budget cycle start day.

mod db;
mod endpoints;

pub use db::{create_setting_table, delete_setting, get_setting, get_settings, upsert_setting};
pub use endpoints::{
    delete_setting_endpoint, get_setting_endpoint, get_settings_endpoint, put_setting_endpoint,
};
