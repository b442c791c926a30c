//! Mount identity (spec.md §3: "Mount identity is stable for the lifetime
//! of the mount"). Grounded on `fuser::mnt::mount_options::Config`: a small,
//! validated, immutable-after-construction configuration value.

use crate::error::{PosixError, Result};

/// The three schemes this personality's URIs ever use (spec.md §6, URI
/// grammar: `scheme ∈ {file, dir, dev}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    File,
    Dir,
    Dev,
}

impl Scheme {
    pub const fn as_prefix(self) -> &'static str {
        match self {
            Scheme::File => "file:",
            Scheme::Dir => "dir:",
            Scheme::Dev => "dev:",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Scheme::File),
            "dir" => Some(Scheme::Dir),
            "dev" => Some(Scheme::Dev),
            _ => None,
        }
    }
}

/// A chroot mount: the binding of a guest-visible path prefix to a PAL URI
/// prefix (spec.md §3). `uri` is never empty and never changes after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(serde::Serialize, serde::Deserialize))]
pub struct Mount {
    uri: String,
}

impl Mount {
    /// Parses and validates a `<scheme>:<root>` URI. `root` may be empty
    /// (meaning the current directory); the personality substitutes `.`
    /// for it at URI-translation time (§4.1), not here, so `Mount::uri`
    /// always reflects exactly what was configured.
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let (scheme, _root) = uri
            .split_once(':')
            .ok_or_else(PosixError::invalid_arg)?;
        Scheme::parse(scheme).ok_or_else(PosixError::invalid_arg)?;
        Ok(Mount { uri })
    }

    /// The full `<scheme>:<root>` URI this mount was configured with.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The mount's own scheme, used by [`crate::uri::UriType::Keep`].
    pub fn scheme(&self) -> Scheme {
        let (scheme, _) = self.uri.split_once(':').expect("validated at construction");
        Scheme::parse(scheme).expect("validated at construction")
    }

    /// The URI with its scheme prefix stripped; `.` if that would be empty
    /// (spec.md §4.1 step 1).
    pub fn root(&self) -> &str {
        let (_, root) = self.uri.split_once(':').expect("validated at construction");
        if root.is_empty() {
            "."
        } else {
            root
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_schemes() {
        assert!(Mount::new("file:/tmp").is_ok());
        assert!(Mount::new("dir:/tmp").is_ok());
        assert!(Mount::new("dev:/tmp").is_ok());
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(Mount::new("http:/tmp").is_err());
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(Mount::new("/tmp").is_err());
    }

    #[test]
    fn empty_root_becomes_dot() {
        let m = Mount::new("file:").unwrap();
        assert_eq!(m.root(), ".");
    }

    #[cfg(feature = "serializable")]
    #[test]
    fn round_trips_through_bincode_across_a_checkpoint() {
        let m = Mount::new("file:/tmp").unwrap();
        let bytes = bincode::serialize(&m).unwrap();
        let restored: Mount = bincode::deserialize(&bytes).unwrap();
        assert_eq!(m, restored);
    }
}
