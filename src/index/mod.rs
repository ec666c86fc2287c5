//! Index structures.
//!
//! - [`ordered_map`] - in-memory red-black map used as the body of a page
//! - [`btree`] - the persistent B-tree built from those pages

pub mod btree;
pub mod ordered_map;
