//! Namespace Mutations (spec.md §4.7): unlink, rename, chmod. Each goes
//! through a temporary read-only PAL handle.

use std::sync::Arc;

use crate::dentry::Dentry;
use crate::error::Result;
use crate::fs::ChrootFs;
use crate::pal::{DeleteScope, Pal};
use crate::uri::{self, UriType};

impl<P: Pal> ChrootFs<P> {
    /// **Unlink** (spec.md §4.7). Opens a temporary read-only PAL handle
    /// using `inode.type`, then deletes. The inode object survives for any
    /// existing handles — it is only detached from the dentry.
    pub fn unlink(&self, dent: &Arc<Dentry>) -> Result<()> {
        let guard = self.dcache().lock();
        let inode = dent.inode().ok_or_else(crate::error::PosixError::not_found)?;
        let ty = UriType::from(inode.kind());
        let temp = self.open_temp(dent, ty, inode.perm())?;
        let result = self.pal().delete(&temp, DeleteScope::All);
        self.pal().close(temp)?;
        result?;
        dent.detach_inode(&guard);
        Dentry::unlink_from_parent(&guard, dent);
        Ok(())
    }

    /// **Rename** (spec.md §4.7). Builds the destination URI using the
    /// source's `inode.type`, opens a temp handle on the source, and
    /// issues `StreamChangeName`. Not atomic against a concurrent unlink of
    /// the destination (spec.md §5: "No cross-inode atomicity").
    pub fn rename(&self, src: &Arc<Dentry>, dst_parent: &Arc<Dentry>, dst_name: &str) -> Result<()> {
        let guard = self.dcache().lock();
        let inode = src.inode().ok_or_else(crate::error::PosixError::not_found)?;
        let ty = UriType::from(inode.kind());
        let temp = self.open_temp(src, ty, inode.perm())?;

        let dst_dent = Dentry::new_child(&guard, dst_parent, dst_name);
        let dst_uri = uri::uri_for(&dst_dent, ty);
        let result = self.pal().change_name(&temp, &dst_uri);
        self.pal().close(temp)?;
        result?;

        Dentry::reparent(&guard, src, dst_parent, dst_name);
        Ok(())
    }

    /// **Chmod** (spec.md §4.7). Under the inode lock: open a temp handle,
    /// set host share flags to `perm | 0o400` (read always retained, per
    /// the same rationale as `do_open`), then set `inode.perm`.
    pub fn chmod(&self, dent: &Arc<Dentry>, perm: u16) -> Result<()> {
        let _guard = self.dcache().lock();
        let inode = dent.inode().ok_or_else(crate::error::PosixError::not_found)?;
        let ty = UriType::from(inode.kind());
        let old_perm = inode.perm();
        let mut inode_guard = inode.lock();
        let temp = self.open_temp(dent, ty, old_perm)?;
        let host_perm = crate::mode::host_perm(perm);
        let result = self.pal().attributes_set_by_handle(&temp, host_perm);
        self.pal().close(temp)?;
        result?;
        inode_guard.perm = perm;
        Ok(())
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
    fn unlink_detaches_inode_but_open_handle_still_works() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let (dent, handle) = fs.creat(&root, "b", 0o600).unwrap();
        fs.write(&handle, b"hello").unwrap();
        fs.unlink(&dent).unwrap();

        assert!(dent.inode().is_none());
        {
            let mut g = handle.lock();
            g.pos = 0;
        }
        let mut buf = [0u8; 5];
        let n = fs.read(&handle, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");

        let err = fs.lookup(&root, "b");
        // After unlink the cached dentry's child list no longer has "b",
        // so a fresh lookup classifies a nonexistent path.
        assert!(err.is_err());
    }

    #[test]
    fn rename_preserves_size_and_old_path_is_gone() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let (dent, handle) = fs.creat(&root, "a", 0o600).unwrap();
        fs.write(&handle, b"hello").unwrap();
        fs.rename(&dent, &root, "b").unwrap();

        assert!(fs.lookup(&root, "a").is_err());
        let b = fs.lookup(&root, "b").unwrap();
        assert_eq!(b.inode().unwrap().size(), 5);
    }

    #[test]
    fn chmod_updates_guest_perm() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let (dent, _handle) = fs.creat(&root, "a", 0o600).unwrap();
        fs.chmod(&dent, 0o400).unwrap();
        assert_eq!(dent.inode().unwrap().perm(), 0o400);
    }
}
