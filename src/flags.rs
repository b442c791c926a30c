//! POSIX `open` flag translation (spec.md §4.4 step 2). Grounded on
//! `fuser::open_flags::OpenFlags`, a thin newtype over the raw flag word
//! with an `acc_mode()` accessor, rather than a `bitflags!` set — the
//! access-mode bits (`O_ACCMODE`) aren't independent flags.

use std::fmt;

use crate::pal::{Access, Create, Options};

/// Raw POSIX open flags as passed to the dentry-ops `open`/`creat` calls.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct OpenFlags(pub i32);

impl fmt::Debug for OpenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenFlags({:#x})", self.0)
    }
}

impl OpenFlags {
    pub fn acc_mode(self) -> AccMode {
        match self.0 & libc::O_ACCMODE {
            libc::O_RDONLY => AccMode::ReadOnly,
            libc::O_WRONLY => AccMode::WriteOnly,
            libc::O_RDWR => AccMode::ReadWrite,
            _ => AccMode::ReadOnly,
        }
    }

    fn has(self, bit: i32) -> bool {
        self.0 & bit != 0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AccMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Translates POSIX `flags` into PAL `(access, create_mode, options)`
/// (spec.md §4.4 step 2).
pub fn translate(flags: OpenFlags) -> (Access, Create, Options) {
    let access = match flags.acc_mode() {
        AccMode::ReadOnly => Access::ReadOnly,
        AccMode::WriteOnly => Access::WriteOnly,
        AccMode::ReadWrite => Access::ReadWrite,
    };
    let create = if flags.has(libc::O_CREAT) && flags.has(libc::O_EXCL) {
        Create::AlwaysExcl
    } else if flags.has(libc::O_CREAT) {
        Create::IfNeeded
    } else {
        Create::Never
    };
    let mut options = Options::empty();
    if flags.has(libc::O_APPEND) {
        options |= Options::APPEND;
    }
    if flags.has(libc::O_TRUNC) {
        options |= Options::TRUNCATE;
    }
    if flags.has(libc::O_NONBLOCK) {
        options |= Options::NONBLOCK;
    }
    (access, create, options)
}

/// `creat` always uses these flags regardless of what the guest passed for
/// the access-mode bits (spec.md §4.4: "creat passes `type=REG` and
/// `O_CREAT|O_EXCL`").
pub fn creat_flags() -> OpenFlags {
    OpenFlags(libc::O_WRONLY | libc::O_CREAT | libc::O_EXCL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rdonly_maps_to_read_access_never_create() {
        let (access, create, _) = translate(OpenFlags(libc::O_RDONLY));
        assert_eq!(access, Access::ReadOnly);
        assert_eq!(create, Create::Never);
    }

    #[test]
    fn creat_excl_maps_to_always_excl() {
        let (_, create, _) = translate(creat_flags());
        assert_eq!(create, Create::AlwaysExcl);
    }

    #[test]
    fn append_and_trunc_become_options() {
        let (_, _, options) = translate(OpenFlags(libc::O_WRONLY | libc::O_APPEND | libc::O_TRUNC));
        assert!(options.contains(Options::APPEND));
        assert!(options.contains(Options::TRUNCATE));
    }
}
