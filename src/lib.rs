pub mod assemble;
pub mod core;
pub mod equation;
pub mod export;
pub mod layout;
pub mod pipeline;
pub mod recognition;
pub mod reconcile;

pub use crate::core::model::{DocumentModel, MergedBlock, PageModel, Region};
