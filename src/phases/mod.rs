//! The two crawl phases.
//!
//! 1. **Discovery** ([`discovery`]): page through the listing and record every
//!    story URL as pending.
//! 2. **Extraction** ([`extraction`]): fetch each pending story page, build
//!    its [`Story`](crate::models::Story), and mark the URL done.
//!
//! Both run on the [`Coordinator`](crate::coordinator::Coordinator) and write
//! their state once, at the end.

pub mod discovery;
pub mod extraction;
