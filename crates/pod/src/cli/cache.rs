//! `pod cache` - direct access to the plain asset cache, addressed by
//! `s3://bucket/key`.
//!
//! The args, subcommands, and dispatch logic live in `pod-cache` itself
//! (behind its `clap` feature) so that other binaries embedding the cache
//! can reuse the same CLI surface; this module just re-exports it.

pub use pod_cache::cli::{run, CacheArgs};
