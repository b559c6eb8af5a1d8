//! Errors reported by tree operations.

use core::fmt;
use std::collections::TryReserveError;
use crate::node::NodeId;


/// Everything that can go wrong while reading or restructuring a tree.
///
/// A failing operation never leaves the tree half-linked: all allocations a
/// step needs are made before the first link is rewritten.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// The allocator refused to hand out memory for a node or a label.
    Alloc(TryReserveError),
    /// The key contains a byte outside of `'0'..='9'`.
    InvalidDigit {
        byte: u8,
        position: usize,
    },
    /// The handle does not name a live node of this tree.
    StaleNode(NodeId),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Alloc(error) => write!(f, "allocation failed: {error}"),
            Error::InvalidDigit { byte, position } => write!(
                f,
                "byte '{}' at position {position} is not a decimal digit",
                char::from(*byte).escape_default(),
            ),
            Error::StaleNode(id) => write!(f, "{id:?} does not name a live node"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Alloc(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(error: TryReserveError) -> Self {
        Error::Alloc(error)
    }
}

/// The result type of fallible tree operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;
