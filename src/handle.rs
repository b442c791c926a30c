//! Open-file handle (spec.md §3): `{ type = CHROOT, dentry, inode, uri,
//! pos, flags, pal_handle?, lock }`.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::dentry::Dentry;
use crate::flags::OpenFlags;
use crate::inode::Inode;
use crate::pal::PalHandle;

/// Fields protected by the handle's own lock (spec.md §3: "each handle has
/// its own lock protecting `pos` and `pal_handle`").
pub(crate) struct HandleMut<H> {
    pub(crate) pos: i64,
    pub(crate) pal_handle: Option<H>,
}

/// An open file, directory, or device handle. `pos` only ever advances for
/// `REG` inodes; for `DIR`/`CHR` it is meaningless and never read (spec.md
/// §3).
pub struct Handle<H: PalHandle> {
    dentry: Arc<Dentry>,
    inode: Arc<Inode>,
    uri: String,
    flags: OpenFlags,
    state: Mutex<HandleMut<H>>,
}

impl<H: PalHandle> Handle<H> {
    /// Constructs a handle that owns `pal_handle` from the moment of
    /// construction. Used by `open`/`creat` (spec.md §4.4 step 5: "transfer
    /// URI ownership into `hdl`, stamp `type=CHROOT`, `pos=0`,
    /// `pal_handle=palhdl`") and by checkpoint restore.
    pub(crate) fn new(
        dentry: Arc<Dentry>,
        inode: Arc<Inode>,
        uri: String,
        flags: OpenFlags,
        pos: i64,
        pal_handle: Option<H>,
    ) -> Arc<Self> {
        Arc::new(Handle {
            dentry,
            inode,
            uri,
            flags,
            state: Mutex::new(HandleMut { pos, pal_handle }),
        })
    }

    pub fn dentry(&self) -> &Arc<Dentry> {
        &self.dentry
    }

    pub fn inode(&self) -> &Arc<Inode> {
        &self.inode
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Current position. Only meaningful for `REG` inodes (spec.md §3).
    pub fn pos(&self) -> i64 {
        self.state.lock().pos
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().pal_handle.is_some()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HandleMut<H>> {
        self.state.lock()
    }
}
