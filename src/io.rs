//! The I/O Path (spec.md §4.5): read, write, mmap, truncate, flush.

use log::trace;

use crate::error::{PosixError, Result};
use crate::fs::ChrootFs;
use crate::handle::Handle;
use crate::inode::{self, Kind, Whence};
use crate::pal::{MapProt, Pal};

/// `SSIZE_MAX` on a 64-bit host; reads/writes larger than this are
/// rejected without touching the PAL (spec.md §4.5, §8).
///
/// `read`/`write` take `buf: &[u8]` rather than a separate `count`
/// decoupled from the buffer's real length, so `buf.len() as i64 >
/// SSIZE_MAX` below is unreachable by construction: Rust guarantees every
/// slice's `len()` is `<= isize::MAX`, which is strictly smaller than
/// `i64::MAX` on any platform this crate targets. The check is kept as a
/// literal transcription of spec.md §4.5's guard (and to avoid silently
/// dropping the documented boundary behavior from the code), not because
/// it can fire; the `pos + count` overflow check just below it is the one
/// this crate can actually exercise (see the
/// `write_rejects_pos_plus_count_overflow` test, which drives that path
/// instead).
const SSIZE_MAX: i64 = i64::MAX;

impl<P: Pal> ChrootFs<P> {
    /// **Seek** (generic, spec.md §4.2/§6): recomputes `pos` under the
    /// handle lock via [`inode::seek`] and stores the result. The returned
    /// value equals `handle.pos()` immediately after the call and is `>= 0`
    /// (spec.md §8 invariant).
    pub fn seek(&self, handle: &Handle<P::Handle>, offset: i64, whence: Whence) -> Result<i64> {
        let mut guard = handle.lock();
        let new_pos = inode::seek(guard.pos, handle.inode().size(), offset, whence)?;
        guard.pos = new_pos;
        Ok(new_pos)
    }

    /// **Read** (spec.md §4.5). Rejects `count > SSIZE_MAX`. Snapshots
    /// `pos` under the handle lock; on a regular file, an overflowing
    /// `pos + count` fails `TOO_BIG` without calling the PAL. Advances
    /// `pos` by the actual count read, for `REG` only.
    pub fn read(&self, handle: &Handle<P::Handle>, buf: &mut [u8]) -> Result<usize> {
        // Unreachable by construction for any `buf` Rust will let us hold — see SSIZE_MAX's doc comment.
        if buf.len() as i64 > SSIZE_MAX {
            return Err(PosixError::too_big());
        }
        let mut guard = handle.lock();
        let pos = guard.pos;
        let kind = handle.inode().kind();
        if kind == Kind::Reg && pos.checked_add(buf.len() as i64).is_none() {
            return Err(PosixError::too_big());
        }
        let pal_handle = guard
            .pal_handle
            .as_ref()
            .ok_or_else(|| PosixError::from_pal_errno(libc::EBADF))?;
        trace!("read(uri={}, pos={pos}, count={})", handle.uri(), buf.len());
        let n = self.pal().read(pal_handle, pos, buf)?;
        if kind == Kind::Reg {
            guard.pos = pos + n as i64;
        }
        Ok(n)
    }

    /// **Write** (spec.md §4.5). Lock order: inode lock, then handle lock
    /// — the crate's sole lock-ordering rule. Advances `pos` and extends
    /// `inode.size` past `pos`, both for `REG` only, while still holding
    /// both locks.
    pub fn write(&self, handle: &Handle<P::Handle>, buf: &[u8]) -> Result<usize> {
        // Unreachable by construction for any `buf` Rust will let us hold — see SSIZE_MAX's doc comment.
        if buf.len() as i64 > SSIZE_MAX {
            return Err(PosixError::too_big());
        }
        let inode = handle.inode().clone();
        let mut inode_guard = inode.lock();
        let mut handle_guard = handle.lock();

        let pos = handle_guard.pos;
        let kind = inode.kind();
        if kind == Kind::Reg && pos.checked_add(buf.len() as i64).is_none() {
            return Err(PosixError::too_big());
        }
        let pal_handle = handle_guard
            .pal_handle
            .as_ref()
            .ok_or_else(|| PosixError::from_pal_errno(libc::EBADF))?;
        trace!("write(uri={}, pos={pos}, count={})", handle.uri(), buf.len());
        let n = self.pal().write(pal_handle, pos, buf)?;
        if kind == Kind::Reg {
            let new_pos = pos + n as i64;
            handle_guard.pos = new_pos;
            if new_pos > inode_guard.size {
                inode_guard.size = new_pos;
            }
        }
        Ok(n)
    }

    /// **mmap** (spec.md §4.5). `MAP_ANONYMOUS` is meaningless for a
    /// file-backed map and is rejected.
    pub fn mmap(&self, handle: &Handle<P::Handle>, anonymous: bool, prot: MapProt, offset: i64, size: usize) -> Result<*mut u8> {
        if anonymous {
            return Err(PosixError::invalid_arg());
        }
        let guard = handle.lock();
        let pal_handle = guard
            .pal_handle
            .as_ref()
            .ok_or_else(|| PosixError::from_pal_errno(libc::EBADF))?;
        self.pal().map(pal_handle, prot, offset, size)
    }

    /// **Truncate** (spec.md §4.5). Under the inode lock: `StreamSetLength`
    /// then set `inode.size` to exactly what was requested.
    pub fn truncate(&self, handle: &Handle<P::Handle>, size: i64) -> Result<()> {
        let inode = handle.inode().clone();
        let mut inode_guard = inode.lock();
        let guard = handle.lock();
        let pal_handle = guard
            .pal_handle
            .as_ref()
            .ok_or_else(|| PosixError::from_pal_errno(libc::EBADF))?;
        self.pal().set_length(pal_handle, size)?;
        inode_guard.size = size;
        Ok(())
    }

    /// **Flush**: thin pass-through (spec.md §4.5).
    pub fn flush(&self, handle: &Handle<P::Handle>) -> Result<()> {
        let guard = handle.lock();
        let pal_handle = guard
            .pal_handle
            .as_ref()
            .ok_or_else(|| PosixError::from_pal_errno(libc::EBADF))?;
        self.pal().flush(pal_handle)
    }
}
