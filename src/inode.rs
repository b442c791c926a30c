//! Generic inode helpers (spec.md §4.2) and the `Inode` cache object
//! (spec.md §3).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{PosixError, Result};
use crate::mount::Mount;

/// The three inode kinds this personality ever materializes (spec.md §3:
/// "`type` never changes after creation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Reg,
    Dir,
    Chr,
}

impl Kind {
    /// The `S_IF*` bits contributed to `st_mode`.
    pub const fn mode_bits(self) -> u32 {
        match self {
            Kind::Reg => libc::S_IFREG as u32,
            Kind::Dir => libc::S_IFDIR as u32,
            Kind::Chr => libc::S_IFCHR as u32,
        }
    }
}

/// Fields protected by the inode's own lock (spec.md §3: "each inode has
/// its own lock protecting `size` and `perm`").
pub(crate) struct InodeMut {
    pub(crate) size: i64,
    pub(crate) perm: u16,
}

/// Cached metadata object: type, perm, size, shared by a dentry and any
/// number of open handles (spec.md §3).
pub struct Inode {
    kind: Kind,
    mount: Arc<Mount>,
    state: Mutex<InodeMut>,
}

impl Inode {
    /// `size > 0` only when `type = REG`; for DIR/CHR `size` is reported
    /// as 0 regardless of what's passed in (spec.md §3 invariant).
    pub fn new(kind: Kind, mount: Arc<Mount>, perm: u16, size: i64) -> Arc<Self> {
        let size = if kind == Kind::Reg { size } else { 0 };
        Arc::new(Inode {
            kind,
            mount,
            state: Mutex::new(InodeMut { size, perm }),
        })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn mount(&self) -> &Arc<Mount> {
        &self.mount
    }

    pub fn size(&self) -> i64 {
        self.state.lock().size
    }

    pub fn perm(&self) -> u16 {
        self.state.lock().perm
    }

    /// Used by chmod (§4.7): sets the guest-visible perm. Does not touch
    /// the host; the caller is responsible for the paired
    /// `StreamAttributesSetByHandle` call.
    pub fn set_perm(&self, perm: u16) {
        self.state.lock().perm = perm;
    }

    /// Used by truncate (§4.5): sets size to exactly the PAL-confirmed
    /// length.
    pub fn set_size(&self, size: i64) {
        self.state.lock().size = size;
    }

    /// Used by write (§4.5): "if `pos > inode.size`, extend `inode.size`."
    /// A no-op if `candidate` does not exceed the current size.
    pub fn extend_size(&self, candidate: i64) {
        let mut s = self.state.lock();
        if candidate > s.size {
            s.size = candidate;
        }
    }

    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, InodeMut> {
        self.state.lock()
    }
}

/// `lseek` origins (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
}

/// Seek arithmetic with overflow checks (spec.md §4.2).
///
/// - `SET` → `pos = offset`
/// - `CUR` → `pos = pos + offset` with checked addition
/// - `END` → `pos = size + offset` with checked addition
/// - overflow → `OVERFLOW`; final `pos < 0` → `INVALID_ARG`
pub fn seek(pos: i64, size: i64, offset: i64, whence: Whence) -> Result<i64> {
    let new_pos = match whence {
        Whence::Set => offset,
        Whence::Cur => pos.checked_add(offset).ok_or_else(PosixError::overflow)?,
        Whence::End => size.checked_add(offset).ok_or_else(PosixError::overflow)?,
    };
    if new_pos < 0 {
        return Err(PosixError::invalid_arg());
    }
    Ok(new_pos)
}

/// `stat`/`hstat` fill (spec.md §4.2): `mode = type | perm`, synthesized
/// `nlink`, and a `dev` derived from the owning mount's URI. Synthesizing
/// `nlink` is deliberate; exact link counts are not maintained.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub mode: u32,
    pub size: i64,
    pub nlink: u32,
    pub dev: u64,
}

pub fn fill_stat(kind: Kind, perm: u16, size: i64, mount: &Mount) -> Stat {
    let mut hasher = DefaultHasher::new();
    mount.uri().hash(&mut hasher);
    Stat {
        mode: kind.mode_bits() | perm as u32,
        size,
        nlink: if kind == Kind::Dir { 2 } else { 1 },
        dev: hasher.finish(),
    }
}

/// Poll readiness for a regular file (spec.md §4.2): "REG files are always
/// writable; readable iff `pos < size`" — a known inaccuracy re: EOF that
/// is documented, not fixed, by design (see spec.md §9 Open Questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReadiness {
    pub readable: bool,
    pub writable: bool,
}

pub fn poll_readiness(kind: Kind, pos: i64, size: i64) -> PollReadiness {
    match kind {
        Kind::Reg => PollReadiness {
            readable: pos < size,
            writable: true,
        },
        // Directories and character devices have no position-based EOF
        // concept in this personality; treat them as always ready, matching
        // the "generic" helper's narrower scope (it only covers REG).
        Kind::Dir | Kind::Chr => PollReadiness {
            readable: true,
            writable: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_set() {
        assert_eq!(seek(5, 100, 42, Whence::Set).unwrap(), 42);
    }

    #[test]
    fn seek_cur() {
        assert_eq!(seek(5, 100, 10, Whence::Cur).unwrap(), 15);
    }

    #[test]
    fn seek_end() {
        assert_eq!(seek(5, 100, 10, Whence::End).unwrap(), 110);
    }

    #[test]
    fn seek_negative_result_is_invalid() {
        assert!(seek(5, 100, -200, Whence::Cur).is_err());
    }

    #[test]
    fn seek_end_overflow() {
        // spec.md §8 boundary behavior: SEEK_END, offset=1, size=INT64_MAX -> OVERFLOW
        assert!(seek(0, i64::MAX, 1, Whence::End).is_err());
    }

    #[test]
    fn poll_reg_eof_not_readable() {
        let r = poll_readiness(Kind::Reg, 10, 10);
        assert!(!r.readable);
        assert!(r.writable);
    }

    #[test]
    fn poll_reg_before_eof_readable() {
        let r = poll_readiness(Kind::Reg, 5, 10);
        assert!(r.readable);
    }
}
