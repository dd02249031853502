//! Shadow model of the recorded page
//!
//! The tree is built from full snapshots and patched by mutation batches.
//! Role classification and label resolution are pure functions over it.

pub mod label;
pub mod node;
pub mod roles;
pub mod tree;

pub use label::{resolve_input_label, resolve_label, resolve_label_with_limit};
pub use node::{AttributeValue, NodeKind, TreeNode};
pub use roles::classify_role;
pub use tree::VirtualDom;
