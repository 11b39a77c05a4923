//! Variable-length records stored in a single block of memory.
//!
//! A record is a set of caller-defined extra fields (`H`), followed by two
//! counters (capacity and length), followed by a contiguous run of `T`
//! elements. Everything lives in one allocation, so the whole record can be
//! copied out as one byte range (see `lower_bound`, `upper_bound` and
//! `as_bytes`).
//!
//! Two variants share the same positional operations:
//!
//! - [`RecordArray`] owns its block and relocates it to grow.
//! - [`PlacedRecordArray`] lives in a caller-supplied buffer, has a fixed
//!   capacity, and reports [`RecordArrayError::CapacityExceeded`] instead of growing.
//!
//! ```
//! use record_array::RecordArray;
//!
//! #[derive(Copy, Clone, Debug, PartialEq)]
//! struct Entry { coord: i32, val: f64 }
//!
//! struct Row { id: u32 }
//!
//! let mut row = RecordArray::with_capacity(Row { id: 7 }, 2);
//! row.extend_one(Entry { coord: 0, val: 1.0 });
//! row.extend_one(Entry { coord: 2, val: 3.0 });
//! row.insert(1, Entry { coord: 1, val: 2.0 });
//!
//! assert_eq!(row.extra().id, 7);
//! assert_eq!(row.len(), 3);
//! assert_eq!(row.at(1).coord, 1);
//! ```
//!
//! Elements are `Copy`: moving them around is a plain byte copy and no
//! destructor ever runs for them. Growth is exact-fit by default; see
//! [`GrowthPolicy`].

pub mod allocator;
pub mod config;
pub mod error;
pub mod owned;
pub mod placed;
mod raw;
mod util;

pub use config::GrowthPolicy;
pub use error::{RecordArrayError, Result};
pub use owned::RecordArray;
pub use placed::PlacedRecordArray;
