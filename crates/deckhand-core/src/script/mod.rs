//! Deck script: the line-oriented command language fragments are written in.
//!
//! - [`parse`]: tokenizer and statement parser
//! - [`exec`] : `ScriptRuntime`, the `FragmentRuntime` that runs it

pub mod exec;
pub mod parse;

pub use exec::ScriptRuntime;
pub use parse::{parse, Statement, StatementKind};
