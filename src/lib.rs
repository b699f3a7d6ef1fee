//! Code Arrange (workspace facade crate).
//!
//! Exposes `code_arrange::{core,adapter,types}` while the implementation lives in dedicated
//! crates under `crates/`.

pub use code_arrange_adapter as adapter;
pub use code_arrange_core as core;
pub use code_arrange_types as types;
