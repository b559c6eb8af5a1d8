#![forbid(unsafe_code)]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/", env!("CARGO_PKG_README")))]

pub mod error;
pub mod iter;
pub mod map;
mod node;
pub mod tree;

pub use error::{Error, Result};
pub use map::DigitMap;
pub use node::{NodeId, RADIX};
pub use tree::{discard, DigitTree, Match, Outcome, DEFAULT_BALANCE_BUDGET};

#[cfg(test)]
mod proptests;
