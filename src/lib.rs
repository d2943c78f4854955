//! The library code for the `blockpress` static site generator. Posts live in
//! a Notion data source; their content is a tree of blocks. Building a post
//! runs three stages:
//!
//! 1. Fetching every block of the post breadth-first ([`crate::fetch`])
//! 2. Normalizing the raw API blocks into a closed set of variants
//!    ([`crate::block`])
//! 3. Rendering the blocks into markup ([`crate::render`]), grouping
//!    consecutive list items and expanding children recursively
//!
//! Around that core, [`crate::post`] reads the post catalogue and resolves
//! posts by slug, and [`crate::build`] writes the site: a page per post,
//! paginated index pages for all posts and for each category, and an Atom
//! feed.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod block;
pub mod build;
pub mod client;
pub mod config;
pub mod feed;
pub mod fetch;
pub mod htmlrenderer;
pub mod post;
pub mod raw;
pub mod render;
pub mod tag;
pub mod write;
