//! A chroot filesystem personality for a library-OS PAL.
//!
//! This crate maps guest-visible POSIX filesystem operations (open, read,
//! write, mmap, truncate, readdir, unlink, rename, chmod, stat, seek, poll,
//! flush) onto host-backed stream objects exposed by a platform abstraction
//! layer (PAL) as typed URIs (`file:`, `dir:`, `dev:`). It maintains an
//! in-memory directory/inode cache coherent with a host it cannot fully
//! trust, keeps open handles usable across checkpoint/restore, and
//! coordinates concurrent guest threads racing on the same inode or handle.
//!
//! The PAL itself — manifest parsing, the syscall dispatcher that calls into
//! this crate, attestation, and build/packaging — are all external
//! collaborators out of scope for this crate. What's in scope is pinned down
//! as the [`pal::Pal`] trait, with one concrete, host-syscall-backed
//! implementation, [`local_pal::LocalPal`], usable in tests and as a
//! reference backend.
//!
//! # Layout
//!
//! - [`mount`] — mount identity: a `<scheme>:<root>` URI, stable for the
//!   mount's lifetime.
//! - [`dentry`] / [`dcache`] — the in-memory directory cache tree and its
//!   global lock.
//! - [`inode`] — cached metadata (type, perm, size), seek arithmetic, stat
//!   fill, and poll readiness.
//! - [`handle`] — open-file objects carrying position and a live PAL
//!   capability.
//! - [`uri`] — the pure dentry-to-URI translator.
//! - [`fs`] — `ChrootFs<P>`, which owns the PAL and the dentry cache and
//!   implements lookup/mount/stat; [`open`], [`io`], [`namespace`], and
//!   [`readdir`] extend it with the rest of the operations.
//! - [`checkpoint`] — the checkout/checkin bridge.
//! - [`ops`] — the guest-facing `FileOps`/`DentryOps` tables and filesystem
//!   descriptor.
//! - [`error`] — the `PosixError`/`Kind` taxonomy every operation returns.

pub mod checkpoint;
mod dcache;
pub mod dentry;
pub mod error;
pub mod flags;
pub mod fs;
pub mod handle;
pub mod inode;
pub mod local_pal;
pub mod mode;
pub mod mount;
mod namespace;
mod open;
pub mod ops;
pub mod pal;
mod readdir;
pub mod uri;

pub use crate::checkpoint::Checkpoint;
pub use crate::dentry::Dentry;
pub use crate::error::{Kind, PosixError, Result};
pub use crate::flags::OpenFlags;
pub use crate::fs::ChrootFs;
pub use crate::handle::Handle;
pub use crate::inode::{Inode, PollReadiness, Stat, Whence};
pub use crate::local_pal::LocalPal;
pub use crate::mount::{Mount, Scheme};
pub use crate::ops::{DentryOps, FileOps, FilesystemDescriptor};
pub use crate::pal::{Access, Create, DeleteScope, HandleType, MapProt, Options, Pal, PalHandle, StreamAttrs};
pub use crate::readdir::readdir_cached;
