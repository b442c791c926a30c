//! Checkpoint Bridge (spec.md §4.8): checkout/checkin hooks that decide
//! whether to serialize a PAL handle or reopen it in the restoring process.

use std::sync::Arc;

use log::debug;

use crate::dentry::Dentry;
use crate::error::Result;
use crate::flags::{self, OpenFlags};
use crate::fs::ChrootFs;
use crate::handle::Handle;
use crate::inode::Inode;
use crate::pal::{Create, Pal};

/// The outcome of [`ChrootFs::checkout`]: either the PAL handle is kept as
/// part of the serialized state (some PAL handle classes, notably
/// protected-file handles, cannot be dropped-and-reopened safely), or it is
/// dropped in favor of reopening by URI on the receiving side (spec.md §9,
/// "The `pal_handle?` field is a sum: `{present | absent-will-reopen}`.
/// Encode explicitly rather than via a sentinel.").
pub enum Checkpoint<H> {
    /// The PAL handle survives the checkpoint boundary as-is.
    Keep(Arc<Handle<H>>),
    /// The PAL handle was dropped; [`ChrootFs::checkin`] must reopen it.
    Reopen {
        dentry: Arc<Dentry>,
        inode: Arc<Inode>,
        uri: String,
        flags: OpenFlags,
        pos: i64,
    },
}

impl<P: Pal> ChrootFs<P> {
    /// **Checkout** (sender side, dcache lock held). If the handle's dentry
    /// still points at the same inode the handle itself holds (i.e. no
    /// intervening rename/unlink-and-replace) and a fresh
    /// `StreamAttributesQuery` on the handle's stored URI succeeds, the PAL
    /// handle is closed here and the child reopens it from scratch. A failed
    /// attribute query is the one documented "recovery": the handle is kept
    /// verbatim instead (spec.md §7).
    pub fn checkout(&self, handle: &Arc<Handle<P::Handle>>) -> Checkpoint<P::Handle> {
        let _guard = self.dcache().lock();
        let same_inode = handle
            .dentry()
            .inode()
            .is_some_and(|i| Arc::ptr_eq(&i, handle.inode()));

        if same_inode && self.pal().attributes_query(handle.uri()).is_ok() {
            debug!("checkout({}): dropping pal_handle, child will reopen", handle.uri());
            let mut guard = handle.lock();
            let pos = guard.pos;
            if let Some(pal_handle) = guard.pal_handle.take() {
                // Best-effort: the handle is already being torn down on
                // this side, so a close failure here is not propagated.
                let _ = self.pal().close(pal_handle);
            }
            drop(guard);
            Checkpoint::Reopen {
                dentry: handle.dentry().clone(),
                inode: handle.inode().clone(),
                uri: handle.uri().to_string(),
                flags: handle.flags(),
                pos,
            }
        } else {
            debug!("checkout({}): serializing pal_handle verbatim", handle.uri());
            Checkpoint::Keep(handle.clone())
        }
    }

    /// **Checkin** (receiver side). If the checkpoint carries a live handle,
    /// it's used as-is; otherwise reopens with the preserved `uri`/`flags`
    /// and `create = NEVER` (spec.md §4.8). Failure propagates.
    pub fn checkin(&self, checkpoint: Checkpoint<P::Handle>) -> Result<Arc<Handle<P::Handle>>> {
        match checkpoint {
            Checkpoint::Keep(handle) => Ok(handle),
            Checkpoint::Reopen {
                dentry,
                inode,
                uri,
                flags: posix_flags,
                pos,
            } => {
                let (access, _create, options) = flags::translate(posix_flags);
                let host_perm = crate::mode::host_perm(inode.perm());
                let pal_handle = self.pal().open(&uri, access, Create::Never, options, host_perm)?;
                Ok(Handle::new(dentry, inode, uri, posix_flags, pos, Some(pal_handle)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_pal::LocalPal;

    fn fs() -> (ChrootFs<LocalPal>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (ChrootFs::new(LocalPal::new()), dir)
    }

    #[test]
    fn round_trip_preserves_position_and_contents() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let (dent, handle) = fs.creat(&root, "b", 0o600).unwrap();
        fs.write(&handle, b"hello world").unwrap();
        {
            let mut g = handle.lock();
            g.pos = 0;
        }

        let checkpoint = fs.checkout(&handle);
        assert!(matches!(checkpoint, Checkpoint::Reopen { .. }));
        let restored = fs.checkin(checkpoint).unwrap();
        assert!(restored.is_open());
        assert_eq!(restored.pos(), 0);
        assert!(Arc::ptr_eq(restored.dentry(), &dent));

        let mut buf = [0u8; 11];
        let n = fs.read(&restored, &mut buf).unwrap();
        assert_eq!(n, 11);
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn checkout_keeps_handle_verbatim_when_inode_was_replaced() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let (dent, handle) = fs.creat(&root, "c", 0o600).unwrap();
        fs.unlink(&dent).unwrap();

        let checkpoint = fs.checkout(&handle);
        assert!(matches!(checkpoint, Checkpoint::Keep(_)));
    }
}
