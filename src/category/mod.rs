//! User-defined spending categories.

mod core;

pub use self::core::{
    Category, CategoryName, create_category, create_category_table, delete_category, get_category,
    list_categories, update_category,
};
