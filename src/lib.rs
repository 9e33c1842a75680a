#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]
#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[cfg(all(feature = "std", not(feature = "alloc")))]
extern crate std;

/// Overflow-, rounding- and domain-safe arithmetic and comparison over the
/// closed set of built-in integer widths and IEEE-754 floating types.
pub mod safe_math;

/// Named/anonymous shared-memory resource with a cooperative, lock-file
/// mediated create/open protocol and a monotonic bump allocator.
#[cfg(feature = "shared-memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "shared-memory")))]
pub mod shared;
