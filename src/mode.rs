//! Guest/host mode and type translation helpers.

use std::os::unix::fs::FileTypeExt;

use crate::error::PosixError;
use crate::inode::Kind;
use crate::pal::HandleType;

/// `host_perm = perm | 0o400` (spec.md §4.4 step 3 and §4.7 chmod): the
/// host-side mode always has the read bit forced, since the PAL needs a
/// readable handle to perform unlink/chmod/rename probes. See spec.md
/// §4.4's rationale — this is an intentional, documented asymmetry, not a
/// bug.
pub fn host_perm(perm: u16) -> u32 {
    (perm as u32 & 0o7777) | 0o400
}

/// Maps the PAL's classification of a probed stream to an inode [`Kind`]
/// (spec.md §4.3 Dentry Materializer). A `Pipe` result is a host FIFO,
/// which this personality does not support opening — callers must
/// translate that case to `PERMISSION_DENIED` themselves (and log a
/// warning), since that's a recoverable outcome, not a `Kind`.
pub fn kind_of(handle_type: HandleType) -> Result<Kind, PosixError> {
    match handle_type {
        HandleType::File => Ok(Kind::Reg),
        HandleType::Dir => Ok(Kind::Dir),
        HandleType::Dev => Ok(Kind::Chr),
        HandleType::Pipe => Err(PosixError::permission()),
    }
}

/// The `nix`/`libc` `S_IF*` bits for a [`Kind`], for embedders that need to
/// build a real `mode_t` (e.g. to hand back through a `stat(2)`-shaped ABI).
pub fn sflag_of(kind: Kind) -> nix::sys::stat::SFlag {
    match kind {
        Kind::Reg => nix::sys::stat::SFlag::S_IFREG,
        Kind::Dir => nix::sys::stat::SFlag::S_IFDIR,
        Kind::Chr => nix::sys::stat::SFlag::S_IFCHR,
    }
}

/// Classifies a `std::fs::FileType` the way [`kind_of`] classifies a PAL
/// [`HandleType`]. Used by embedders that probe the host directly (as
/// [`crate::local_pal::LocalPal`] does) rather than through a richer PAL.
pub fn kind_of_file_type(file_type: std::fs::FileType) -> Result<Kind, PosixError> {
    if file_type.is_dir() {
        Ok(Kind::Dir)
    } else if file_type.is_char_device() {
        Ok(Kind::Chr)
    } else if file_type.is_fifo() {
        Err(PosixError::permission())
    } else {
        Ok(Kind::Reg)
    }
}
