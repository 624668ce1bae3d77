//! URL handling module for Layer-Crawl
//!
//! Only host extraction lives here: the crawler routes downloads by host and
//! otherwise compares URLs as plain strings.

mod domain;

pub use domain::host_of;
