//! Handle Lifecycle (spec.md §4.4): open/creat/mkdir share a single
//! internal `do_open` routine.

use std::sync::Arc;

use log::trace;

use crate::dentry::Dentry;
use crate::error::Result;
use crate::flags::{self, OpenFlags};
use crate::fs::ChrootFs;
use crate::handle::Handle;
use crate::inode::{Inode, Kind};
use crate::mode;
use crate::pal::{Create, Pal};
use crate::uri::{self, UriType};

impl<P: Pal> ChrootFs<P> {
    /// `do_open(hdl?, dent, type, flags, perm)` (spec.md §4.4).
    ///
    /// 1. Builds the URI with the concrete `type`.
    /// 2. Translates POSIX `flags` into PAL `(access, create_mode, options)`.
    /// 3. Computes `host_perm = perm | 0o400`.
    /// 4. Invokes `StreamOpen`; PAL failures propagate 1:1.
    /// 5. If binding a handle: transfers URI ownership in, stamps `pos=0`.
    ///    Otherwise the PAL handle is closed immediately (probe-only open,
    ///    used by mkdir and the namespace-mutation temp-handle callers).
    fn do_open(
        &self,
        dent: &Arc<Dentry>,
        ty: UriType,
        posix_flags: OpenFlags,
        perm: u16,
        bind: bool,
    ) -> Result<Option<Arc<Handle<P::Handle>>>> {
        let target_uri = uri::uri_for(dent, ty);
        let (access, create, options) = flags::translate(posix_flags);
        let host_perm = mode::host_perm(perm);
        trace!("do_open({target_uri}): access={access:?} create={create:?} options={options:?} host_perm={host_perm:#o}");
        let pal_handle = self.pal.open(&target_uri, access, create, options, host_perm)?;

        if !bind {
            self.pal.close(pal_handle)?;
            return Ok(None);
        }

        let inode = dent
            .inode()
            .unwrap_or_else(|| Inode::new(ty_to_kind(ty), dent.mount().clone(), perm, 0));
        let handle = Handle::new(dent.clone(), inode, target_uri, posix_flags, 0, Some(pal_handle));
        Ok(Some(handle))
    }

    /// **open**: requires an already-materialized inode and opens using
    /// `inode.type` (spec.md §4.4).
    pub fn open(&self, dent: &Arc<Dentry>, flags: OpenFlags) -> Result<Arc<Handle<P::Handle>>> {
        let _guard = self.dcache().lock();
        let inode = dent.inode().ok_or_else(crate::error::PosixError::not_found)?;
        let ty = UriType::from(inode.kind());
        self.do_open(dent, ty, flags, inode.perm(), true)
            .map(|h| h.expect("bind=true always returns Some"))
    }

    /// **creat**: `type=REG`, `O_CREAT|O_EXCL`; creates the inode with the
    /// requested perm (spec.md §4.4).
    pub fn creat(
        &self,
        parent: &Arc<Dentry>,
        name: &str,
        perm: u16,
    ) -> Result<(Arc<Dentry>, Arc<Handle<P::Handle>>)> {
        let guard = self.dcache().lock();
        let dent = Dentry::new_child(&guard, parent, name);
        let handle = self
            .do_open(&dent, UriType::Reg, flags::creat_flags(), perm, true)?
            .expect("bind=true always returns Some");
        dent.attach_inode(&guard, handle.inode().clone());
        Ok((dent, handle))
    }

    /// **mkdir**: identical shape to `creat` but `type=DIR`, with no handle
    /// bound (spec.md §4.4).
    pub fn mkdir(&self, parent: &Arc<Dentry>, name: &str, perm: u16) -> Result<Arc<Dentry>> {
        let guard = self.dcache().lock();
        let dent = Dentry::new_child(&guard, parent, name);
        self.do_open(
            &dent,
            UriType::Dir,
            OpenFlags(libc::O_RDONLY | libc::O_CREAT | libc::O_EXCL),
            perm,
            false,
        )?;
        let inode = Inode::new(Kind::Dir, dent.mount().clone(), perm, 0);
        dent.attach_inode(&guard, inode);
        Ok(dent)
    }

    /// Opens a temporary read-only PAL handle on `dent` using `ty`, for the
    /// namespace-mutation and readdir callers that need a probe handle but
    /// never bind it to a guest [`Handle`] (spec.md §4.7, §4.6).
    ///
    /// Takes `perm` as an explicit argument rather than reading
    /// `dent.inode().perm()` itself: `chmod` calls this while already
    /// holding the inode lock, and `Inode::perm` takes that same lock, so
    /// deriving it here would deadlock.
    pub(crate) fn open_temp(&self, dent: &Arc<Dentry>, ty: UriType, perm: u16) -> Result<P::Handle> {
        let target_uri = uri::uri_for(dent, ty);
        let host_perm = mode::host_perm(perm);
        self.pal
            .open(&target_uri, crate::pal::Access::ReadOnly, Create::Never, crate::pal::Options::empty(), host_perm)
    }
}

fn ty_to_kind(ty: UriType) -> Kind {
    match ty {
        UriType::Reg => Kind::Reg,
        UriType::Dir => Kind::Dir,
        UriType::Chr => Kind::Chr,
        UriType::Keep => Kind::Reg,
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
    fn creat_then_open() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let (dent, handle) = fs.creat(&root, "a", 0o600).unwrap();
        assert!(handle.is_open());
        assert_eq!(dent.inode().unwrap().perm(), 0o600);
    }

    #[test]
    fn mkdir_creates_dir_inode_without_handle() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let dent = fs.mkdir(&root, "sub", 0o755).unwrap();
        assert_eq!(dent.inode().unwrap().kind(), Kind::Dir);
        assert!(dir.path().join("sub").is_dir());
    }

    #[test]
    fn open_requires_materialized_inode() {
        let (fs, dir) = fs();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let dent = Dentry::new_child(&fs.dcache().lock(), &root, "missing");
        assert!(fs.open(&dent, flags::OpenFlags(libc::O_RDONLY)).is_err());
    }
}
