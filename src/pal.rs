//! The platform abstraction layer surface this personality is built against
//! (spec.md §6, "Downward"). The PAL itself is an external collaborator —
//! out of scope — but its contract is pinned down here as a trait so the
//! rest of the crate can be written, and unit tested, against it.
//!
//! This mirrors how `fuser` pins down the FUSE kernel ABI as a set of typed
//! request/reply structs (`src/ll/`) rather than inlining raw syscalls
//! throughout the crate.

use crate::error::Result;
use std::fmt;

/// The three stream-like object kinds the PAL can hand back from a probe.
/// `Pipe` is accepted by the PAL but rejected by the dentry materializer
/// (spec.md §4.3): host FIFOs are not supported, only personality-created
/// pipes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleType {
    File,
    Dir,
    Dev,
    Pipe,
}

/// Attributes returned by `StreamAttributesQuery`.
#[derive(Debug, Clone, Copy)]
pub struct StreamAttrs {
    pub handle_type: HandleType,
    /// Host-reported share flags, used as the guest-visible `perm` when a
    /// dentry is first materialized.
    pub share_flags: u32,
    /// Size in bytes as reported by the host; meaningful only for `File`.
    pub pending_size: i64,
}

/// File access mode requested of `StreamOpen`, the PAL-level analogue of
/// `fuser::open_flags::OpenAccMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Whether `StreamOpen` should create the object, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Create {
    /// Fail if the object does not already exist.
    Never,
    /// Create if missing.
    IfNeeded,
    /// Create, and fail if it already exists (`O_CREAT|O_EXCL`).
    AlwaysExcl,
}

bitflags::bitflags! {
    /// Options passed alongside access/create to `StreamOpen`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Options: u32 {
        const APPEND   = 1 << 0;
        const TRUNCATE = 1 << 1;
        const NONBLOCK = 1 << 2;
    }
}

bitflags::bitflags! {
    /// `prot`/`flags` for `StreamMap`, translated from POSIX `mmap` args.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapProt: u32 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC  = 1 << 2;
    }
}

/// What to delete: spec.md only ever calls `StreamDelete` with `ALL`
/// (no partial/range delete is modeled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    All,
}

/// An opaque capability handed back by `StreamOpen`. The PAL owns what this
/// actually is; the personality only ever holds it behind `PalHandle` and
/// passes it back into PAL calls or `ObjectClose`.
pub trait PalHandle: fmt::Debug + Send + Sync {
    /// Used only for trace logging; not load-bearing.
    fn debug_id(&self) -> u64 {
        0
    }
}

/// The PAL trait. A `StreamOpen` success must be paired with `close` on
/// every exit path unless transferred into a guest handle (spec.md §5,
/// "Resource discipline").
pub trait Pal: Send + Sync {
    type Handle: PalHandle;

    fn attributes_query(&self, uri: &str) -> Result<StreamAttrs>;

    fn open(
        &self,
        uri: &str,
        access: Access,
        create: Create,
        options: Options,
        host_perm: u32,
    ) -> Result<Self::Handle>;

    fn read(&self, handle: &Self::Handle, offset: i64, buf: &mut [u8]) -> Result<usize>;

    fn write(&self, handle: &Self::Handle, offset: i64, buf: &[u8]) -> Result<usize>;

    fn map(
        &self,
        handle: &Self::Handle,
        prot: MapProt,
        offset: i64,
        size: usize,
    ) -> Result<*mut u8>;

    fn set_length(&self, handle: &Self::Handle, size: i64) -> Result<()>;

    fn flush(&self, handle: &Self::Handle) -> Result<()>;

    fn delete(&self, handle: &Self::Handle, scope: DeleteScope) -> Result<()>;

    fn change_name(&self, handle: &Self::Handle, new_uri: &str) -> Result<()>;

    fn attributes_set_by_handle(&self, handle: &Self::Handle, share_flags: u32) -> Result<()>;

    fn close(&self, handle: Self::Handle) -> Result<()>;
}
