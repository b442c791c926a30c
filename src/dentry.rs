//! The dentry cache tree (spec.md §3): `{ parent, name, mount, inode?,
//! children }`.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::dcache::DCacheGuard;
use crate::inode::Inode;
use crate::mount::Mount;

/// A node in the directory cache tree. Reads of `name`/`parent`/`inode`/
/// `children` are lock-free from the caller's perspective (each field has
/// its own leaf `Mutex`); structural mutations that must be atomic with
/// respect to the rest of the tree (attaching an inode, adding/removing a
/// child, re-parenting on rename) require a [`DCacheGuard`], matching
/// spec.md §3's "dcache lock protects the dentry tree and dentry→inode
/// linking."
pub struct Dentry {
    parent: Mutex<Option<Weak<Dentry>>>,
    name: Mutex<String>,
    mount: Arc<Mount>,
    inode: Mutex<Option<Arc<Inode>>>,
    children: Mutex<Vec<Arc<Dentry>>>,
}

impl Dentry {
    /// Creates the root dentry of a fresh mount. `inode` is absent until
    /// lookup materializes it (spec.md §3).
    pub fn new_root(mount: Arc<Mount>) -> Arc<Self> {
        Arc::new(Dentry {
            parent: Mutex::new(None),
            name: Mutex::new(String::new()),
            mount,
            inode: Mutex::new(None),
            children: Mutex::new(Vec::new()),
        })
    }

    /// Creates (or reuses, if already cached) a child dentry under `parent`.
    pub fn new_child(_dcache: &DCacheGuard<'_>, parent: &Arc<Dentry>, name: &str) -> Arc<Self> {
        if let Some(existing) = parent
            .children
            .lock()
            .iter()
            .find(|c| *c.name.lock() == name)
            .cloned()
        {
            return existing;
        }
        let child = Arc::new(Dentry {
            parent: Mutex::new(Some(Arc::downgrade(parent))),
            name: Mutex::new(name.to_string()),
            mount: parent.mount.clone(),
            inode: Mutex::new(None),
            children: Mutex::new(Vec::new()),
        });
        parent.children.lock().push(child.clone());
        child
    }

    pub fn mount(&self) -> &Arc<Mount> {
        &self.mount
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn parent(&self) -> Option<Arc<Dentry>> {
        self.parent.lock().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_root(&self) -> bool {
        self.parent.lock().is_none()
    }

    pub fn inode(&self) -> Option<Arc<Inode>> {
        self.inode.lock().clone()
    }

    /// Attaches a freshly materialized inode (§4.3 Dentry Materializer).
    pub fn attach_inode(&self, _dcache: &DCacheGuard<'_>, inode: Arc<Inode>) {
        *self.inode.lock() = Some(inode);
    }

    /// Detaches the inode from the dentry (unlink, §4.7). "The inode
    /// object survives for any existing handles" — any handle that already
    /// holds its own `Arc<Inode>` clone keeps it alive.
    pub fn detach_inode(&self, _dcache: &DCacheGuard<'_>) {
        *self.inode.lock() = None;
    }

    pub fn children(&self) -> Vec<Arc<Dentry>> {
        self.children.lock().clone()
    }

    pub fn find_child(&self, name: &str) -> Option<Arc<Dentry>> {
        self.children.lock().iter().find(|c| *c.name.lock() == name).cloned()
    }

    /// Re-parents `self_arc` under `new_parent` with `new_name` (rename,
    /// §4.7: "Rename preserves inode and mutates path.").
    pub fn reparent(
        _dcache: &DCacheGuard<'_>,
        self_arc: &Arc<Dentry>,
        new_parent: &Arc<Dentry>,
        new_name: &str,
    ) {
        if let Some(old_parent) = self_arc.parent() {
            old_parent
                .children
                .lock()
                .retain(|c| !Arc::ptr_eq(c, self_arc));
        }
        *self_arc.parent.lock() = Some(Arc::downgrade(new_parent));
        *self_arc.name.lock() = new_name.to_string();
        new_parent.children.lock().push(self_arc.clone());
    }

    /// Removes `self_arc` from its parent's children (rename's destination
    /// replacement, or a future explicit detach). Leaves `self_arc`'s own
    /// fields untouched, matching unlink's "inode survives" behavior at
    /// the dentry-tree level: `self_arc` itself remains a valid (if
    /// unreachable) object for anyone still holding a clone.
    pub fn unlink_from_parent(_dcache: &DCacheGuard<'_>, self_arc: &Arc<Dentry>) {
        if let Some(parent) = self_arc.parent() {
            parent.children.lock().retain(|c| !Arc::ptr_eq(c, self_arc));
        }
    }

    /// The dentry's path relative to its mount's root: the sequence of
    /// names from (excluding) the mount root down to (including) `self`,
    /// joined with `/`. Empty at the mount root itself.
    pub fn mount_relative_path(&self) -> String {
        if self.is_root() {
            return String::new();
        }
        let mut parts: smallvec::SmallVec<[String; 8]> = smallvec::SmallVec::new();
        parts.push(self.name());
        let mut ancestor = self.parent();
        while let Some(p) = ancestor {
            if p.is_root() {
                break;
            }
            parts.push(p.name());
            ancestor = p.parent();
        }
        parts.reverse();
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcache::DCache;

    #[test]
    fn root_has_empty_relative_path() {
        let mount = Arc::new(Mount::new("file:/tmp").unwrap());
        let root = Dentry::new_root(mount);
        assert_eq!(root.mount_relative_path(), "");
    }

    #[test]
    fn child_relative_path() {
        let dcache = DCache::new();
        let g = dcache.lock();
        let mount = Arc::new(Mount::new("file:/tmp").unwrap());
        let root = Dentry::new_root(mount);
        let a = Dentry::new_child(&g, &root, "a");
        let b = Dentry::new_child(&g, &a, "b");
        assert_eq!(a.mount_relative_path(), "a");
        assert_eq!(b.mount_relative_path(), "a/b");
    }

    #[test]
    fn rename_mutates_path_preserves_identity() {
        let dcache = DCache::new();
        let g = dcache.lock();
        let mount = Arc::new(Mount::new("file:/tmp").unwrap());
        let root = Dentry::new_root(mount);
        let src_dir = Dentry::new_child(&g, &root, "srcdir");
        let dst_dir = Dentry::new_child(&g, &root, "dstdir");
        let f = Dentry::new_child(&g, &src_dir, "f");
        Dentry::reparent(&g, &f, &dst_dir, "g");
        assert_eq!(f.mount_relative_path(), "dstdir/g");
        assert!(src_dir.find_child("f").is_none());
        assert!(dst_dir.find_child("g").is_some());
    }
}
