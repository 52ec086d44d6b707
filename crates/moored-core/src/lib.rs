//! Shared primitives for the `moored` container crates.
//!
//! Three small pieces live here:
//!
//! - [`block`] — the header-block allocator: one contiguous allocation holding a typed
//!   header followed by an aligned, variable-length array of trivial element records.
//!   Both containers build their nodes on it.
//! - [`compare`] — the [`Comparator`] seam through which callers supply the ordering
//!   relation on element values.
//! - [`rand`] — the deterministic 64-bit linear-congruential generator that feeds
//!   skip-list height sampling and the test key streams.

pub mod block;
pub mod compare;
pub mod rand;


pub use self::block::RawBlock;
pub use self::compare::{Comparator, OrdComparator};
pub use self::rand::Lcg64;
