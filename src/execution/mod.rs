//! Node execution.
//!
//! This module runs single node invocations on behalf of a host.

pub mod invoke;

pub use invoke::{invoke_node, NodeInvoker};
