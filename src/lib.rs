//! Value representation of chess moves: the [`Move`] record, the
//! [`MoveTag`] consequences attached to it and the [`MoveList`] a move
//! generator fills and a game looks moves up in.
//!
//! Move generation, legality checks, board state and notation other than UCI
//! live elsewhere: this crate only represents moves, it never validates them.
//!
//! [`Move`]: crate::chess::moves::Move
//! [`MoveTag`]: crate::chess::moves::MoveTag
//! [`MoveList`]: crate::chess::moves::MoveList

// Rustdoc lints.
#![warn(
    rustdoc::missing_crate_level_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_html_tags,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls
)]
// Performance is extremely important.
#![deny(clippy::perf)]

pub mod chess;
