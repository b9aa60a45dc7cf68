//! Chart of accounts.
//!
//! - Account types and their normal-balance convention
//! - The in-memory account tree used for hierarchy rules, cycle checks
//!   and parent suggestion by code

pub mod tree;
pub mod types;

#[cfg(test)]
mod tree_props;

pub use tree::{AccountNode, ChartTree, HierarchyError};
pub use types::{AccountType, NormalBalance};
