//! fmf metadata tree loader.

pub mod tree;

pub use tree::{FmfTree, FmfTreeLoader};
