// cnshield-context/src/lib.rs
//! Context matching and score arithmetic shared by the cnshield recognizers.
//!
//! Everything here is pure and allocation-light so that it can be reused by
//! the regex path, the statistical path and the rule tester alike.
//!
//! License: MIT OR APACHE 2.0
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod context;
pub mod heuristics;
pub mod scoring;
pub mod window;

/// Common type definitions
pub type Score = f64;

pub use context::ContextMatcher;
pub use scoring::BoostPolicy;
