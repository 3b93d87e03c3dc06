//! Recursive-descent parser driver producing fact trees.
//!
//! Grammars drive a [`Parser`] over any [`TokenSource`]: open a [`Marker`],
//! consume tokens, complete the marker into a node. Error recovery inserts
//! missing tokens and folds skipped text into the trivia of the next token.
//! Speculative productions run between a [`Checkpoint`] and a rewind.

mod checkpoint;
mod parser;
mod source;

pub use checkpoint::{Checkpoint, ContextFlags, ParseContext};
pub use parser::{CompletedMarker, Marker, Mismatch, Parser};
pub use source::{LexedToken, TokenBuffer, TokenSource};
