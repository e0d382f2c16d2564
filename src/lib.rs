//! # rarena - A Region-Based Bump Arena
//!
//! This crate provides a **region arena**: a bump allocator that carves tightly
//! packed, aligned blocks out of large `mmap`-backed regions and gives all of
//! them back to the operating system in one go.
//!
//! ## Overview
//!
//! ```text
//!   Arena:
//!
//!   head                                                 current
//!    │                                                      │
//!    ▼                                                      ▼
//!   ┌────────┬──────────────────┐    ┌────────┬──────────────────┐
//!   │ Region │ A1 │ A2 │ A3 │░░░│ ─► │ Region │ A4 │ A5 │        │ ─► null
//!   └────────┴──────────────────┘    └────────┴──────────────────┘
//!     header   full (tail unused)      header   bump cursor ▲
//!
//!   Allocation bumps the cursor of the current region.
//!   A request that does not fit maps a new region and continues there.
//!   Release unmaps every region at once.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rarena
//!   ├── align      - Power-of-two checks and address rounding
//!   ├── arena      - Arena: region chain, growth, bulk release
//!   ├── config     - ArenaConfig (region size, env override)
//!   ├── error      - ArenaError, MapError
//!   ├── os         - mmap / munmap boundary
//!   └── region     - Region header and bump cursor
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::alloc::Layout;
//! use rarena::Arena;
//!
//! let mut arena = Arena::new(4096).unwrap();
//!
//! let ptr = arena.allocate_layout(Layout::new::<u64>()).unwrap().cast::<u64>();
//! unsafe { ptr.as_ptr().write(42) };
//! assert_eq!(unsafe { ptr.as_ptr().read() }, 42);
//!
//! // Every block handed out above becomes invalid here.
//! arena.release();
//! assert!(arena.allocate(8, 8).is_err());
//! ```
//!
//! ## Region Layout
//!
//! Each region is a single anonymous mapping whose first bytes hold its own
//! header:
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Region Header      │         Payload                │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ next: ptr/null  │  │  ┌──────────────────────────┐  │
//!   │  │ capacity: N     │  │  │                          │  │
//!   │  │ free: cursor    │  │  │     N bytes usable       │  │
//!   │  │ base: payload   │  │  │                          │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │  Region::HEADER_SIZE  │                                │
//!   └───────────────────────┴────────────────────────────────┘
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Arena` is neither `Send` nor `Sync`
//! - **Bulk release only**: individual blocks are never freed or reused
//! - **Fixed region size**: requests larger than one region's payload fail
//! - **Unix-only**: requires `libc` `mmap`/`munmap`
//!
//! ## Safety
//!
//! Blocks are returned as raw `NonNull<u8>` pointers. Reading or writing them
//! after [`Arena::release`] (or after the arena is dropped) is undefined
//! behavior. If the operating system refuses a mapping the process aborts.

pub mod align;
mod arena;
mod config;
mod error;
pub mod os;
mod region;

pub use arena::{Arena, Regions};
pub use config::{ArenaConfig, REGION_SIZE_ENV};
pub use error::{ArenaError, MapError, Result};
pub use region::Region;
