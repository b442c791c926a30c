//! Error taxonomy for the chroot personality (spec §7).
//!
//! Mirrors `fuser::ll::Errno` in spirit: a thin newtype over a POSIX errno
//! with a small set of symbolic kinds layered on top, rather than a generic
//! `Box<dyn Error>` stack. Every public operation in this crate returns
//! `Result<T, PosixError>`.

use std::fmt;

/// Symbolic error kinds from spec.md §7. `Bug` is never constructed as an
/// `Err` value — see [`bug`]; it is kept as a variant so this enum's shape
/// matches the full seven-kind taxonomy spec.md §7 documents, rather than
/// silently shrinking the documented classification to the six kinds this
/// crate actually returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Bad seek origin, non-file/dev mount URI, `MAP_ANONYMOUS` on mmap.
    InvalidArg,
    /// Allocation failure (URI buffer, readdir buffer, inode alloc).
    OutOfMemory,
    /// `count > SSIZE_MAX`, or `pos + count` would overflow on a regular file.
    TooBig,
    /// Seek arithmetic overflow.
    Overflow,
    /// Host-level FIFO encountered during lookup.
    Permission,
    /// Any other PAL failure, translated 1:1.
    Pal,
    /// Unreachable PAL handle type, malformed readdir chunk. Never
    /// constructed as a `PosixError`; see [`bug`], which panics instead of
    /// returning an `Err` of this kind.
    Bug,
}

/// A POSIX-flavored error: a [`Kind`] plus the raw errno that a syscall
/// dispatcher (out of scope for this crate) would surface to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixError {
    kind: Kind,
    errno: libc::c_int,
}

impl PosixError {
    /// Builds an error of the given kind with an explicit errno.
    pub const fn new(kind: Kind, errno: libc::c_int) -> Self {
        PosixError { kind, errno }
    }

    pub const fn invalid_arg() -> Self {
        Self::new(Kind::InvalidArg, libc::EINVAL)
    }

    pub const fn out_of_memory() -> Self {
        Self::new(Kind::OutOfMemory, libc::ENOMEM)
    }

    pub const fn too_big() -> Self {
        Self::new(Kind::TooBig, libc::EFBIG)
    }

    pub const fn overflow() -> Self {
        Self::new(Kind::Overflow, libc::EOVERFLOW)
    }

    pub const fn permission() -> Self {
        Self::new(Kind::Permission, libc::EACCES)
    }

    pub const fn not_found() -> Self {
        Self::new(Kind::Pal, libc::ENOENT)
    }

    /// Wraps a raw PAL-reported errno. Used for the "PAL-mapped" row of the
    /// §7 table: any other PAL failure, translated 1:1.
    pub const fn from_pal_errno(errno: libc::c_int) -> Self {
        Self::new(Kind::Pal, errno)
    }

    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// The raw errno a syscall dispatcher should surface to the guest.
    pub const fn errno(&self) -> libc::c_int {
        self.errno
    }
}

impl fmt::Display for PosixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (errno {})", self.kind, self.errno)
    }
}

impl std::error::Error for PosixError {}

impl From<std::io::Error> for PosixError {
    fn from(e: std::io::Error) -> Self {
        match e.raw_os_error() {
            Some(errno) => PosixError::from_pal_errno(errno),
            None => PosixError::from_pal_errno(libc::EIO),
        }
    }
}

impl From<PosixError> for std::io::Error {
    fn from(e: PosixError) -> Self {
        std::io::Error::from_raw_os_error(e.errno)
    }
}

/// Logs an error-level message and panics. Used for the `BUG` class in
/// spec.md §7 (unreachable PAL handle type, empty readdir name): these are
/// process-terminating assertions, not recoverable `Err` values, matching
/// "Assertions (BUG) are unrecoverable and terminate."
#[macro_export]
macro_rules! bug {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
        panic!($($arg)*);
    }};
}

pub type Result<T> = std::result::Result<T, PosixError>;
