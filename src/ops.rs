//! The guest-facing operation tables (spec.md §6, "Upward"): file-ops,
//! dentry-ops, and the filesystem descriptor that names them. `ChrootFs<P>`
//! already implements every one of these operations as an inherent method
//! (see `fs`, `io`, `open`, `namespace`, `readdir`, `checkpoint`); the traits
//! here exist so a syscall dispatcher (out of scope for this crate) can hold
//! a `&dyn FileOps` / `&dyn DentryOps` the way `fuser::Filesystem` is the
//! single trait object a kernel session dispatches through.

use std::sync::Arc;

use crate::checkpoint::Checkpoint;
use crate::dentry::Dentry;
use crate::error::Result;
use crate::flags::OpenFlags;
use crate::handle::Handle;
use crate::inode::{Stat, Whence};
use crate::pal::{MapProt, Pal};

/// Operations addressed by an open handle: `{ mount, flush, read, write,
/// mmap, seek, hstat, truncate, poll, checkout, checkin }` (spec.md §6).
pub trait FileOps {
    type PalHandle;

    fn mount(&self, uri: &str) -> Result<Arc<Dentry>>;
    fn flush(&self, handle: &Handle<Self::PalHandle>) -> Result<()>;
    fn read(&self, handle: &Handle<Self::PalHandle>, buf: &mut [u8]) -> Result<usize>;
    fn write(&self, handle: &Handle<Self::PalHandle>, buf: &[u8]) -> Result<usize>;
    fn mmap(
        &self,
        handle: &Handle<Self::PalHandle>,
        anonymous: bool,
        prot: MapProt,
        offset: i64,
        size: usize,
    ) -> Result<*mut u8>;
    fn seek(&self, handle: &Handle<Self::PalHandle>, offset: i64, whence: Whence) -> Result<i64>;
    fn hstat(&self, handle: &Handle<Self::PalHandle>) -> Stat;
    fn truncate(&self, handle: &Handle<Self::PalHandle>, size: i64) -> Result<()>;
    fn poll(&self, handle: &Handle<Self::PalHandle>) -> crate::inode::PollReadiness;
    fn checkout(&self, handle: &Arc<Handle<Self::PalHandle>>) -> Checkpoint<Self::PalHandle>;
    fn checkin(&self, checkpoint: Checkpoint<Self::PalHandle>) -> Result<Arc<Handle<Self::PalHandle>>>;
}

/// Operations addressed by a dentry: `{ open, lookup, creat, mkdir, stat,
/// readdir, unlink, rename, chmod }` (spec.md §6).
pub trait DentryOps {
    type PalHandle;

    fn open(&self, dent: &Arc<Dentry>, flags: OpenFlags) -> Result<Arc<Handle<Self::PalHandle>>>;
    fn lookup(&self, parent: &Arc<Dentry>, name: &str) -> Result<Arc<Dentry>>;
    fn creat(
        &self,
        parent: &Arc<Dentry>,
        name: &str,
        perm: u16,
    ) -> Result<(Arc<Dentry>, Arc<Handle<Self::PalHandle>>)>;
    fn mkdir(&self, parent: &Arc<Dentry>, name: &str, perm: u16) -> Result<Arc<Dentry>>;
    fn stat(&self, dent: &Arc<Dentry>) -> Result<Stat>;
    fn readdir(&self, dent: &Arc<Dentry>, f: &mut dyn FnMut(&str, &Arc<Dentry>) -> Result<()>) -> Result<()>;
    fn unlink(&self, dent: &Arc<Dentry>) -> Result<()>;
    fn rename(&self, src: &Arc<Dentry>, dst_parent: &Arc<Dentry>, dst_name: &str) -> Result<()>;
    fn chmod(&self, dent: &Arc<Dentry>, perm: u16) -> Result<()>;
}

/// The filesystem descriptor (spec.md §6): `{ name="chroot", fs_ops, d_ops }`.
/// A marker value; the operations themselves live on `ChrootFs<P>` via
/// [`FileOps`]/[`DentryOps`].
#[derive(Debug, Clone, Copy)]
pub struct FilesystemDescriptor {
    pub name: &'static str,
}

impl Default for FilesystemDescriptor {
    fn default() -> Self {
        FilesystemDescriptor { name: "chroot" }
    }
}

impl<P: Pal> FileOps for crate::fs::ChrootFs<P> {
    type PalHandle = P::Handle;

    fn mount(&self, uri: &str) -> Result<Arc<Dentry>> {
        crate::fs::ChrootFs::mount(self, uri.to_string())
    }

    fn flush(&self, handle: &Handle<Self::PalHandle>) -> Result<()> {
        crate::fs::ChrootFs::flush(self, handle)
    }

    fn read(&self, handle: &Handle<Self::PalHandle>, buf: &mut [u8]) -> Result<usize> {
        crate::fs::ChrootFs::read(self, handle, buf)
    }

    fn write(&self, handle: &Handle<Self::PalHandle>, buf: &[u8]) -> Result<usize> {
        crate::fs::ChrootFs::write(self, handle, buf)
    }

    fn mmap(
        &self,
        handle: &Handle<Self::PalHandle>,
        anonymous: bool,
        prot: MapProt,
        offset: i64,
        size: usize,
    ) -> Result<*mut u8> {
        crate::fs::ChrootFs::mmap(self, handle, anonymous, prot, offset, size)
    }

    fn seek(&self, handle: &Handle<Self::PalHandle>, offset: i64, whence: Whence) -> Result<i64> {
        crate::fs::ChrootFs::seek(self, handle, offset, whence)
    }

    fn hstat(&self, handle: &Handle<Self::PalHandle>) -> Stat {
        crate::inode::fill_stat(
            handle.inode().kind(),
            handle.inode().perm(),
            handle.inode().size(),
            handle.inode().mount(),
        )
    }

    fn truncate(&self, handle: &Handle<Self::PalHandle>, size: i64) -> Result<()> {
        crate::fs::ChrootFs::truncate(self, handle, size)
    }

    fn poll(&self, handle: &Handle<Self::PalHandle>) -> crate::inode::PollReadiness {
        crate::inode::poll_readiness(handle.inode().kind(), handle.pos(), handle.inode().size())
    }

    fn checkout(&self, handle: &Arc<Handle<Self::PalHandle>>) -> Checkpoint<Self::PalHandle> {
        crate::fs::ChrootFs::checkout(self, handle)
    }

    fn checkin(&self, checkpoint: Checkpoint<Self::PalHandle>) -> Result<Arc<Handle<Self::PalHandle>>> {
        crate::fs::ChrootFs::checkin(self, checkpoint)
    }
}

impl<P: Pal> DentryOps for crate::fs::ChrootFs<P> {
    type PalHandle = P::Handle;

    fn open(&self, dent: &Arc<Dentry>, flags: OpenFlags) -> Result<Arc<Handle<Self::PalHandle>>> {
        crate::fs::ChrootFs::open(self, dent, flags)
    }

    fn lookup(&self, parent: &Arc<Dentry>, name: &str) -> Result<Arc<Dentry>> {
        crate::fs::ChrootFs::lookup(self, parent, name)
    }

    fn creat(
        &self,
        parent: &Arc<Dentry>,
        name: &str,
        perm: u16,
    ) -> Result<(Arc<Dentry>, Arc<Handle<Self::PalHandle>>)> {
        crate::fs::ChrootFs::creat(self, parent, name, perm)
    }

    fn mkdir(&self, parent: &Arc<Dentry>, name: &str, perm: u16) -> Result<Arc<Dentry>> {
        crate::fs::ChrootFs::mkdir(self, parent, name, perm)
    }

    fn stat(&self, dent: &Arc<Dentry>) -> Result<Stat> {
        crate::fs::ChrootFs::stat(self, dent)
    }

    fn readdir(&self, dent: &Arc<Dentry>, f: &mut dyn FnMut(&str, &Arc<Dentry>) -> Result<()>) -> Result<()> {
        crate::fs::ChrootFs::readdir(self, dent, f)
    }

    fn unlink(&self, dent: &Arc<Dentry>) -> Result<()> {
        crate::fs::ChrootFs::unlink(self, dent)
    }

    fn rename(&self, src: &Arc<Dentry>, dst_parent: &Arc<Dentry>, dst_name: &str) -> Result<()> {
        crate::fs::ChrootFs::rename(self, src, dst_parent, dst_name)
    }

    fn chmod(&self, dent: &Arc<Dentry>, perm: u16) -> Result<()> {
        crate::fs::ChrootFs::chmod(self, dent, perm)
    }
}
