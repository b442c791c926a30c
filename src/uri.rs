//! The URI Translator (spec.md §4.1): pure function mapping a dentry plus a
//! requested file-type flag to a PAL URI string with the correct scheme
//! prefix.

use crate::dentry::Dentry;
use crate::inode::Kind;
use crate::mount::Scheme;

/// `type ∈ {REG, DIR, CHR, KEEP}` from spec.md §4.1. `Keep` preserves the
/// mount's own scheme for the initial lookup probe, since the PAL
/// distinguishes e.g. `dev:tty` from `file:tty` and the type is unknown
/// before that probe runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriType {
    Reg,
    Dir,
    Chr,
    Keep,
}

impl From<Kind> for UriType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Reg => UriType::Reg,
            Kind::Dir => UriType::Dir,
            Kind::Chr => UriType::Chr,
        }
    }
}

fn prefix(ty: UriType, mount_scheme: Scheme) -> &'static str {
    match ty {
        UriType::Reg => "file:",
        UriType::Dir => "dir:",
        UriType::Chr => "dev:",
        UriType::Keep => mount_scheme.as_prefix(),
    }
}

/// `uri_for(dent, type) → string` (spec.md §4.1). Infallible in this crate:
/// the only documented failure mode (`OUT_OF_MEMORY` on allocation failure)
/// is not representable in safe Rust string building, so it is omitted —
/// see DESIGN.md.
pub fn uri_for(dent: &Dentry, ty: UriType) -> String {
    let root = dent.mount().root();
    let rel = dent.mount_relative_path();
    let mut out = String::with_capacity(prefix(ty, dent.mount().scheme()).len() + root.len() + 1 + rel.len());
    out.push_str(prefix(ty, dent.mount().scheme()));
    out.push_str(root);
    if !rel.is_empty() {
        out.push('/');
        out.push_str(&rel);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcache::DCache;
    use crate::mount::Mount;
    use std::sync::Arc;

    #[test]
    fn root_uri_has_no_trailing_slash() {
        let mount = Arc::new(Mount::new("file:/tmp").unwrap());
        let root = Dentry::new_root(mount);
        assert_eq!(uri_for(&root, UriType::Reg), "file:/tmp");
    }

    #[test]
    fn child_uri_appends_relative_path() {
        let dcache = DCache::new();
        let g = dcache.lock();
        let mount = Arc::new(Mount::new("file:/tmp").unwrap());
        let root = Dentry::new_root(mount);
        let a = Dentry::new_child(&g, &root, "a");
        assert_eq!(uri_for(&a, UriType::Reg), "file:/tmp/a");
    }

    #[test]
    fn keep_preserves_mount_scheme() {
        let mount = Arc::new(Mount::new("dev:/tmp").unwrap());
        let root = Dentry::new_root(mount);
        assert_eq!(uri_for(&root, UriType::Keep), "dev:/tmp");
    }

    #[test]
    fn dir_and_chr_prefixes() {
        let mount = Arc::new(Mount::new("file:/tmp").unwrap());
        let root = Dentry::new_root(mount);
        assert_eq!(uri_for(&root, UriType::Dir), "dir:/tmp");
        assert_eq!(uri_for(&root, UriType::Chr), "dev:/tmp");
    }

    #[test]
    fn empty_root_substitutes_dot() {
        let mount = Arc::new(Mount::new("file:").unwrap());
        let root = Dentry::new_root(mount);
        assert_eq!(uri_for(&root, UriType::Reg), "file:.");
    }
}
