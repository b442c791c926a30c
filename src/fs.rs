//! The chroot filesystem personality: owns the PAL, the dentry cache lock,
//! and implements the operations described across spec.md §4.
//!
//! `ChrootFs<P>` is generic over the PAL (spec.md §1: "the PAL itself...is
//! assumed" as an external collaborator); this crate pins its contract down
//! as the [`crate::pal::Pal`] trait so the personality can be built and
//! tested independent of any particular host.

use std::sync::Arc;

use log::warn;

use crate::dcache::DCache;
use crate::dentry::Dentry;
use crate::error::{PosixError, Result};
use crate::inode::{Inode, Stat};
use crate::mode;
use crate::mount::Mount;
use crate::pal::Pal;
use crate::uri::{self, UriType};

/// Owns the PAL and the dentry cache for one chroot personality instance.
/// Analogous in spirit to a `fuser::Filesystem` implementor, except this
/// type *is* the filesystem implementation rather than a trait a caller
/// provides — the guest-visible file-ops/dentry-ops tables (spec.md §6) are
/// thin delegating wrappers in [`crate::ops`].
pub struct ChrootFs<P: Pal> {
    pal: P,
    dcache: DCache,
}

impl<P: Pal> ChrootFs<P> {
    pub fn new(pal: P) -> Self {
        ChrootFs {
            pal,
            dcache: DCache::new(),
        }
    }

    pub fn pal(&self) -> &P {
        &self.pal
    }

    pub(crate) fn dcache(&self) -> &DCache {
        &self.dcache
    }

    /// Mounts `uri` and returns its root dentry, uninitialized (no inode
    /// attached yet — the first `lookup`/`stat` on it materializes one,
    /// exactly like any other dentry).
    pub fn mount(&self, uri: impl Into<String>) -> Result<Arc<Dentry>> {
        let mount = Arc::new(Mount::new(uri)?);
        Ok(Dentry::new_root(mount))
    }

    /// Looks up `name` under `parent`, materializing its inode if this is
    /// the first time it's been seen (spec.md §4.3 Dentry Materializer).
    ///
    /// Probes the host with a `KEEP`-prefixed URI so the PAL's own
    /// classification decides the concrete type; a host FIFO fails with
    /// `PERMISSION_DENIED` and a warning (host FIFOs are not supported,
    /// only personality-created pipes are). An unreachable PAL handle type
    /// is a `BUG`.
    pub fn lookup(&self, parent: &Arc<Dentry>, name: &str) -> Result<Arc<Dentry>> {
        let guard = self.dcache.lock();
        let dent = Dentry::new_child(&guard, parent, name);
        if dent.inode().is_none() {
            let probe_uri = uri::uri_for(&dent, UriType::Keep);
            let attrs = self.pal.attributes_query(&probe_uri)?;
            let kind = match mode::kind_of(attrs.handle_type) {
                Ok(k) => k,
                Err(e) => {
                    warn!("lookup({probe_uri}): host FIFO is not supported");
                    return Err(e);
                }
            };
            let inode = Inode::new(kind, dent.mount().clone(), attrs.share_flags as u16, attrs.pending_size);
            dent.attach_inode(&guard, inode);
        }
        Ok(dent)
    }

    /// **Stat** (generic, spec.md §4.2/§6): fills a [`Stat`] from the
    /// dentry's materialized inode. Requires a prior `lookup`.
    pub fn stat(&self, dent: &Arc<Dentry>) -> Result<Stat> {
        let inode = dent.inode().ok_or_else(PosixError::not_found)?;
        Ok(crate::inode::fill_stat(
            inode.kind(),
            inode.perm(),
            inode.size(),
            inode.mount(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_pal::LocalPal;
    use crate::inode::Kind;

    fn fs() -> (ChrootFs<LocalPal>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let fs = ChrootFs::new(LocalPal::new());
        (fs, dir)
    }

    #[test]
    fn lookup_classifies_regular_file() {
        let (fs, dir) = fs();
        std::fs::write(dir.path().join("a"), b"hi").unwrap();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let a = fs.lookup(&root, "a").unwrap();
        assert_eq!(a.inode().unwrap().kind(), Kind::Reg);
        assert_eq!(a.inode().unwrap().size(), 2);
    }

    #[test]
    fn lookup_classifies_directory() {
        let (fs, dir) = fs();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let d = fs.lookup(&root, "d").unwrap();
        assert_eq!(d.inode().unwrap().kind(), Kind::Dir);
        assert_eq!(d.inode().unwrap().size(), 0);
    }

    #[test]
    fn lookup_twice_is_idempotent() {
        let (fs, dir) = fs();
        std::fs::write(dir.path().join("a"), b"hi").unwrap();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let a1 = fs.lookup(&root, "a").unwrap();
        let a2 = fs.lookup(&root, "a").unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(Arc::ptr_eq(a1.inode().as_ref().unwrap(), a2.inode().as_ref().unwrap()));
    }

    #[test]
    fn lookup_rejects_fifo() {
        let (fs, dir) = fs();
        let fifo_path = dir.path().join("p");
        nix::unistd::mkfifo(&fifo_path, nix::sys::stat::Mode::from_bits_truncate(0o600)).unwrap();
        let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
        let err = fs.lookup(&root, "p").unwrap_err();
        assert_eq!(err.errno(), libc::EACCES);
    }
}
