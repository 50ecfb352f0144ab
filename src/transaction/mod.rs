//! Transaction management: the `Transaction` model, its database functions
//! and the REST endpoints for listing, creating, editing and deleting transactions.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod query;

pub use core::{
    DEFAULT_CATEGORY, MAX_AMOUNT, Transaction, TransactionBuilder, TransactionKind,
    TransactionUpdate, create_transaction_table, get_recent_transactions, insert_transaction,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::{
    get_transaction_endpoint, get_transaction_stats_endpoint, get_transactions_endpoint,
};
pub use query::DateRange;

#[cfg(test)]
pub use core::{count_transactions, create_transaction, get_transaction};
