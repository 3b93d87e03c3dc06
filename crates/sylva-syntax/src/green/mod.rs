//! Immutable, position-independent fact nodes.
//!
//! Fact nodes know their width and flags but not their absolute position;
//! the same subtree can be shared between several parents. Positions are
//! computed by the views in [`crate::syntax`].

mod builder;
mod children;
mod diagnostics;
mod element;
mod node;
mod token;

pub use builder::Builder;
pub use children::{LONG_LIST_THRESHOLD, ListShape};
pub(crate) use diagnostics::Diagnostics;
pub use diagnostics::SubtreeDiagnostics;
pub use element::{GreenElement, GreenElementRef};
pub use node::GreenNode;
pub use token::GreenToken;

use rustc_hash::FxHasher;

/// Builds the hasher every memoized content hash starts from.
fn content_hasher() -> FxHasher {
    FxHasher::default()
}

/// Folds a finished hash into the memo slot's value space, where 0 means
/// "not computed yet".
fn memo_hash(hash: u64) -> u32 {
    ((hash >> 32) as u32 ^ hash as u32).max(1)
}
