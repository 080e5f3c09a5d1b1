//! Transaction management: the `Transaction` model, its store operations,
//! and the deduplicating merge used by statement imports.

mod core;
mod merge;

pub use self::core::{
    Transaction, TransactionBuilder, clear_transactions, count_transactions, create_transaction,
    create_transaction_table, get_transaction, list_transactions, map_transaction_row,
    set_transaction_category,
};
pub use self::merge::{MergeOutcome, existing_fingerprints, merge_new};
