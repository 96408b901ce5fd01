//! newswire: a concurrent RSS/Atom aggregation service.
//!
//! A fixed set of feed sources is crawled on an interval, normalized into
//! a canonical feed/article model, and upserted into Postgres under a
//! single serializable transaction per cycle. Re-crawling converges on the
//! same rows instead of duplicating them.

pub mod config;
pub mod domain;
pub mod feed;
pub mod server;
pub mod service;
pub mod social;
pub mod storage;
pub mod util;
pub mod worker;
