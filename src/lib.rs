//! # brkalloc - A First-Fit Heap Allocator
//!
//! This crate provides a **first-fit free-list allocator** that manages one
//! growable heap region, the way a classic `malloc`/`free` built on `sbrk`
//! does: freed space is reused, split, merged with its neighbours and, when
//! it sits at the end of the heap, handed back to the operating system.
//!
//! ## Overview
//!
//! Every byte of the heap belongs to exactly one block. A block is a header
//! followed by its payload, and the next block starts right where the
//! payload ends:
//!
//! ```text
//!   heap start                                                heap boundary
//!   │                                                                     │
//!   ▼                                                                     ▼
//!   ┌────┬──────────┬────┬─────────────────┬────┬────────┬────┬──────────┐
//!   │ H  │  used    │ H  │      free       │ H  │  used  │ H  │  used    │
//!   └────┴──────────┴────┴─────────────────┴────┴────────┴────┴──────────┘
//!     │               ▲ │                    ▲ │           ▲ │
//!     └── next ───────┘ └──── next ──────────┘ └── next ───┘ └─► none
//!
//!   H = header { size, is_free, prev, next }
//! ```
//!
//! The headers form a doubly linked list in address order (the block
//! directory). The allocator never keeps any state outside of it but the
//! list's head and tail.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Word rounding macro (align!)
//!   ├── block      - Block header layout (internal)
//!   ├── directory  - Address-ordered block list (internal)
//!   ├── heap       - Heap trait and the fixed-capacity ArenaHeap
//!   ├── sbrk       - SbrkHeap, the process heap through sbrk(2)
//!   ├── first_fit  - FirstFitAllocator: allocate, release, merge, shrink
//!   ├── locked     - LockedAllocator: spin lock + GlobalAlloc (feature "spin")
//!   ├── config     - AllocatorConfig
//!   └── error      - AllocError, InvariantViolation
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkalloc::{ArenaHeap, FirstFitAllocator};
//!
//! let mut allocator = FirstFitAllocator::new(ArenaHeap::with_capacity(4096));
//!
//! let a = allocator.allocate(10).unwrap();
//! let b = allocator.allocate(20).unwrap();
//! allocator.payload_mut(a).unwrap().copy_from_slice(b"0123456789");
//!
//! allocator.release(b).unwrap();
//! allocator.release(a).unwrap();
//! assert_eq!(allocator.boundary(), 0);
//! ```
//!
//! ## How It Works
//!
//! Allocation scans the directory from the heap start and takes the first
//! free block that is large enough. If the rest of that block can hold
//! another header plus at least one byte, it is split off as a new free
//! block; otherwise the caller keeps the few extra bytes:
//!
//! ```text
//!   allocate(n) from a free block of size s:
//!
//!   s - n - header > 0              s - n - header <= 0
//!   ┌───┬─────┬───┬───────┐         ┌───┬─────────────┐
//!   │ H │  n  │ H │ free  │         │ H │  n  (+pad)  │
//!   └───┴─────┴───┴───────┘         └───┴─────────────┘
//! ```
//!
//! When nothing fits, the heap grows by exactly one header plus the request.
//!
//! Release marks the block free, merges it with a free predecessor and a
//! free successor, then shrinks the heap while the last block is free:
//!
//! ```text
//!   before release(B):  │ A free │ B used │ C free │ D used │
//!   after  merge:       │ A free (A + B + C)       │ D used │
//!
//!   release(D):         │ A free                   │ D free │ ◄─ boundary
//!   after  shrink:      ◄─ boundary (heap empty)
//! ```
//!
//! ## Heaps
//!
//! The allocator is generic over [`Heap`], a region addressed by byte
//! offsets that only grows and shrinks at its top:
//!
//! - [`ArenaHeap`] reserves a fixed capacity up front. Growing past it fails
//!   like an exhausted address space.
//! - [`SbrkHeap`] moves the real program break with `sbrk(2)`. Nothing else in
//!   the process may move the break while it is in use.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: [`FirstFitAllocator`] takes `&mut self`; share it
//!   through [`LockedAllocator`]
//! - **Word alignment at most**: no size classes, no over-aligned payloads
//! - **No zeroing**: payloads hold whatever was there before
//! - **Unix-only** for [`SbrkHeap`]: requires `libc` and `sbrk`
//!
//! ## Safety
//!
//! Working with offsets through [`FirstFitAllocator`] is safe: bad releases
//! are reported as [`AllocError::InvalidRelease`] unless `validate_release`
//! is turned off in [`AllocatorConfig`]. Raw pointers only
//! show up at the [`GlobalAlloc`](std::alloc::GlobalAlloc) boundary.

pub mod align;
mod block;
mod config;
mod directory;
mod error;
mod first_fit;
mod heap;
#[cfg(feature = "spin")]
mod locked;
mod sbrk;

pub use block::{HEADER_SIZE, WORD};
pub use config::AllocatorConfig;
pub use error::{AllocError, InvariantViolation, Result};
pub use first_fit::{BlockInfo, FirstFitAllocator};
pub use heap::{ArenaHeap, Heap};
#[cfg(feature = "spin")]
pub use locked::LockedAllocator;
pub use sbrk::SbrkHeap;
