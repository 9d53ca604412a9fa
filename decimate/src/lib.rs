#![doc = include_str!("../README.md")]
//! # API notes
//!
//! * The delta codec, reshuffler, and round driver all operate on plain
//! files rather than in-memory buffers, since the data sizes involved
//! (millions of samples per round) are meant to be handled without holding
//! the whole decimated layout in memory longer than necessary.
//! * The external IID battery is modeled as the [`round::IidBattery`]
//! trait; this crate contains no statistical test implementations of its
//! own.

#![deny(clippy::unused_unit)]
#![deny(dead_code)]

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
struct ReadmeDoctest;

pub use errors::{DecimateError, DecimateResult, ErrorKind};

pub mod codec;
pub mod cutoff;
pub mod errors;
pub mod reshuffle;
pub mod round;
pub mod search;
pub mod store;
