//! Income and expense transactions and their local currency totals.

mod db;
mod domain;
mod endpoints;

pub use db::{
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    update_transaction,
};
pub use domain::{NewTransaction, Transaction, TransactionData, TransactionId};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
    list_transactions_endpoint, update_transaction_endpoint,
};
