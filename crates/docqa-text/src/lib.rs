//! docqa-text
//!
//! Tantivy-backed lexical index: the reliability backstop of the search
//! cascade. Scores are term-overlap based and normalized to `[0,1]`.
pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::TantivyLexicalIndex;
