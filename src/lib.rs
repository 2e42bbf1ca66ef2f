//! An ordered map from integer keys to string values, implemented with an AVL tree.
//!
//! Besides search, insertion and deletion the tree can be split around a key
//! into two valid trees, and two trees can be joined around a separating entry
//! in time proportional to their height difference.
//!
//! ```
//! use avl_join::BalancedTree;
//!
//! let mut tree = BalancedTree::new();
//! for key in [5, 3, 8, 1, 4, 7, 9] {
//!     tree.insert(key, format!("v{key}")).unwrap();
//! }
//! assert_eq!(tree.keys_in_order(), vec![1, 3, 4, 5, 7, 8, 9]);
//! assert_eq!(tree.min(), Some("v1"));
//!
//! let (mut smaller, larger) = tree.split(5).unwrap();
//! assert_eq!(smaller.keys_in_order(), vec![1, 3, 4]);
//! assert_eq!(larger.keys_in_order(), vec![7, 8, 9]);
//!
//! smaller.join(6, "v6", larger).unwrap();
//! assert_eq!(smaller.keys_in_order(), vec![1, 3, 4, 6, 7, 8, 9]);
//! ```

mod error;
mod iter;
mod tree;

pub use error::{Result, TreeError};
pub use iter::Iter;
pub use tree::BalancedTree;

#[cfg(test)]
mod proptests;
