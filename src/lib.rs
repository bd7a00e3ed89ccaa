//! A compressed bitmap for 64-bit unsigned integer sets.
//!
//! This crate provides [`VastBitmap`], an ordered set of `u64` optimized
//! for spatially clustered data: dense runs, sparse tails, and small
//! clusters coexist efficiently in one structure.
//!
//! # How it works
//!
//! Each value splits into a 48-bit high part and a 16-bit low part. High
//! parts key an adaptive radix tree (node fan-outs of 4/16/48/256 with
//! compressed prefixes), encoded big-endian so byte order equals unsigned
//! numeric order. Each tree leaf owns a *container* holding the low parts
//! for that prefix in whichever of three forms is smallest at its current
//! cardinality:
//!
//! - a sorted `u16` array (up to 4096 values),
//! - a fixed 8192-byte bitmap (above 4096 values),
//! - a run-length form (opt-in via [`VastBitmap::run_optimize`]).
//!
//! # Features
//!
//! - **Membership, rank, select** in a few cache lines per query
//! - **Bulk range insertion and flipping** over arbitrary `u64` spans
//! - **Set algebra** (union, intersection, difference, symmetric
//!   difference) with in-place and copying variants, plus operator sugar
//! - **Ordered iteration** both directions, with `peek` and `seek`
//! - **Compact serialization** with structural validation on read
//! - **Serde support** as a value sequence (optional `serde` feature)
//!
//! # Examples
//!
//! ```
//! use vast_bitmap::VastBitmap;
//!
//! let mut bitmap = VastBitmap::new();
//! bitmap.insert_range(0, 1000).unwrap();
//! bitmap.insert(u64::MAX);
//!
//! assert_eq!(bitmap.len(), 1001);
//! assert_eq!(bitmap.rank(499), 500);
//! assert_eq!(bitmap.select(1000).unwrap(), u64::MAX);
//! assert_eq!(bitmap.max(), Some(u64::MAX));
//!
//! let bytes = bitmap.to_bytes();
//! assert_eq!(VastBitmap::from_bytes(&bytes).unwrap(), bitmap);
//! ```

#![warn(missing_docs)]

mod art;
mod bitmap;
mod container;
mod error;
mod iter;
mod key;
mod serialize;
mod visit;

#[cfg(feature = "serde")]
mod serde;

pub use bitmap::VastBitmap;
pub use error::{Error, Result};
pub use iter::{Iter, RevIter};
pub use visit::RangeVisitor;
