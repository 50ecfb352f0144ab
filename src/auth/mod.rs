//! User accounts, password hashing and cookie based sessions.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod profile;
mod token;
mod user;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::post_log_in;
pub use log_out::post_log_out;
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{get_me, post_change_password};
pub use user::{
    User, UserID, UserProfile, count_users, create_user, create_user_table, get_user_by_id,
    get_user_by_username, update_password,
};

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;
