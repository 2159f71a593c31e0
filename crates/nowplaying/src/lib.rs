//! Best-effort "now playing" discovery for internet radio streams.
//!
//! Given nothing but a stream URL, [`MetadataResolver`] derives the likely
//! station base address, probes the metadata endpoint conventions of the
//! common streaming-server families (Shoutcast v1/v2, Icecast JSON, Icecast
//! legacy HTML) concurrently, and returns the first usable track title after
//! sanitizing it for display. Absence is a normal outcome, not an error:
//! `resolve` never fails, it only sometimes comes back empty-handed.

pub mod base;
pub mod probe;
pub mod resolver;
pub mod sanitize;

pub use resolver::{MetadataResolver, ResolverConfig};
