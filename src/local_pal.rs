//! `LocalPal`: a concrete [`Pal`] backed by the process's real filesystem.
//!
//! Grounded on how `fuser`'s `dev_fuse.rs` newtypes a `std::fs::File` to
//! represent a host-side stream, and on the `nix`-based syscalls used across
//! the teacher's passthrough-style examples. Used by this crate's own test
//! suite (spec.md §8 end-to-end scenarios) and usable as a reference PAL by
//! embedders who don't yet have a richer one.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt, PermissionsExt};
use std::os::unix::io::AsRawFd;
use std::sync::Mutex;

use nix::sys::stat::Mode;
use nix::unistd::ftruncate;

use crate::error::{PosixError, Result};
use crate::pal::{Access, Create, DeleteScope, HandleType, MapProt, Options, Pal, PalHandle, StreamAttrs};

/// The opaque handle `LocalPal` hands back: a real open file descriptor,
/// plus the host path it was opened from (needed for path-addressed
/// operations like delete/rename that spec.md's PAL models as taking a
/// handle but that POSIX itself addresses by path).
#[derive(Debug)]
pub struct LocalHandle {
    file: Mutex<File>,
    path: std::path::PathBuf,
    /// Lazily built on the first directory read: the NUL-joined names
    /// under `path`, serialized once so repeated reads at growing offsets
    /// behave like a real host directory-stream read.
    dir_listing: Mutex<Option<Vec<u8>>>,
}

impl PalHandle for LocalHandle {
    fn debug_id(&self) -> u64 {
        self.file.lock().expect("handle mutex poisoned").as_raw_fd() as u64
    }
}

/// Strips the `<scheme>:` prefix from a URI and returns the path portion.
/// `file:`, `dir:`, and `dev:` are the only schemes this personality emits
/// (spec.md §6, URI grammar).
fn path_of(uri: &str) -> &str {
    uri.split_once(':').map(|(_, rest)| rest).unwrap_or(uri)
}

/// A host-backed [`Pal`] implementation for use in tests and as the default
/// out-of-the-box backend.
#[derive(Debug, Default)]
pub struct LocalPal;

impl LocalPal {
    pub fn new() -> Self {
        LocalPal
    }

    /// Serves a directory-stream read: the host has no `pread` analogue for
    /// directory listings, so this builds a NUL-joined name buffer once and
    /// serves slices of it at growing offsets, matching a real PAL's
    /// directory-read contract (spec.md §4.6) — never splitting a name
    /// across the bytes a single read returns.
    fn read_dir_at(&self, handle: &LocalHandle, offset: i64, buf: &mut [u8]) -> Result<usize> {
        let mut listing = handle.dir_listing.lock().expect("handle mutex poisoned");
        if listing.is_none() {
            let mut names = Vec::new();
            for entry in fs::read_dir(&handle.path).map_err(PosixError::from)? {
                let entry = entry.map_err(PosixError::from)?;
                names.extend_from_slice(entry.file_name().as_encoded_bytes());
                // PAL convention: subdirectories carry a trailing `/`
                // (spec.md §4.6); the personality strips it back off.
                if entry.file_type().map_err(PosixError::from)?.is_dir() {
                    names.push(b'/');
                }
                names.push(0);
            }
            *listing = Some(names);
        }
        let data = listing.as_ref().expect("just populated");
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let want = buf.len().min(data.len() - offset);
        let slice = &data[offset..offset + want];
        match slice.iter().rposition(|&b| b == 0) {
            Some(pos) => {
                let served = pos + 1;
                buf[..served].copy_from_slice(&slice[..served]);
                Ok(served)
            }
            // Not even one whole name fits in `buf`; the caller grows its
            // buffer and retries at the same offset (spec.md §4.6).
            None => Err(PosixError::from_pal_errno(libc::ENOBUFS)),
        }
    }
}

impl Pal for LocalPal {
    type Handle = LocalHandle;

    fn attributes_query(&self, uri: &str) -> Result<StreamAttrs> {
        let path = path_of(uri);
        let meta = fs::symlink_metadata(path).map_err(PosixError::from)?;
        let ft = meta.file_type();
        let handle_type = if ft.is_dir() {
            HandleType::Dir
        } else if ft.is_char_device() {
            HandleType::Dev
        } else if ft.is_fifo() {
            HandleType::Pipe
        } else {
            HandleType::File
        };
        Ok(StreamAttrs {
            handle_type,
            share_flags: meta.permissions().mode() & 0o777,
            pending_size: if handle_type == HandleType::File {
                meta.len() as i64
            } else {
                0
            },
        })
    }

    fn open(
        &self,
        uri: &str,
        access: Access,
        create: Create,
        options: Options,
        host_perm: u32,
    ) -> Result<Self::Handle> {
        let path = path_of(uri);

        // `dir:` URIs with a create request are a mkdir, not an open: a
        // POSIX host has no "open a directory with O_CREAT" operation.
        if uri.starts_with("dir:") && matches!(create, Create::IfNeeded | Create::AlwaysExcl) {
            let mode = Mode::from_bits_truncate(host_perm & 0o777);
            match nix::unistd::mkdir(path, mode) {
                Ok(()) => {}
                Err(nix::errno::Errno::EEXIST) if create == Create::IfNeeded => {}
                Err(e) => return Err(PosixError::from_pal_errno(e as i32)),
            }
            let file = File::open(path).map_err(PosixError::from)?;
            return Ok(LocalHandle {
                file: Mutex::new(file),
                path: std::path::PathBuf::from(path),
                dir_listing: Mutex::new(None),
            });
        }

        let mut opts = OpenOptions::new();
        match access {
            Access::ReadOnly => {
                opts.read(true);
            }
            Access::WriteOnly => {
                opts.write(true);
            }
            Access::ReadWrite => {
                opts.read(true).write(true);
            }
        }
        match create {
            Create::Never => {}
            Create::IfNeeded => {
                opts.create(true);
            }
            Create::AlwaysExcl => {
                opts.create_new(true);
            }
        }
        if options.contains(Options::APPEND) {
            opts.append(true);
        }
        if options.contains(Options::TRUNCATE) {
            opts.truncate(true);
        }
        opts.mode(host_perm);

        let file = opts.open(path).map_err(PosixError::from)?;
        Ok(LocalHandle {
            file: Mutex::new(file),
            path: std::path::PathBuf::from(path),
            dir_listing: Mutex::new(None),
        })
    }

    fn read(&self, handle: &Self::Handle, offset: i64, buf: &mut [u8]) -> Result<usize> {
        use std::os::unix::fs::FileExt;
        let file = handle.file.lock().expect("handle mutex poisoned");
        if file.metadata().map_err(PosixError::from)?.is_dir() {
            drop(file);
            return self.read_dir_at(handle, offset, buf);
        }
        let n = file.read_at(buf, offset as u64).map_err(PosixError::from)?;
        Ok(n)
    }

    fn write(&self, handle: &Self::Handle, offset: i64, buf: &[u8]) -> Result<usize> {
        use std::os::unix::fs::FileExt;
        let file = handle.file.lock().expect("handle mutex poisoned");
        let n = file.write_at(buf, offset as u64).map_err(PosixError::from)?;
        Ok(n)
    }

    fn map(
        &self,
        _handle: &Self::Handle,
        _prot: MapProt,
        _offset: i64,
        _size: usize,
    ) -> Result<*mut u8> {
        // Memory mapping a host fd requires unsafe platform calls outside
        // this reference PAL's scope; embedders with a real mmap-capable
        // PAL supply their own `Pal::map`.
        Err(PosixError::from_pal_errno(libc::ENOSYS))
    }

    fn set_length(&self, handle: &Self::Handle, size: i64) -> Result<()> {
        let file = handle.file.lock().expect("handle mutex poisoned");
        ftruncate(&*file, size).map_err(|e| PosixError::from_pal_errno(e as i32))?;
        Ok(())
    }

    fn flush(&self, handle: &Self::Handle) -> Result<()> {
        use io::Write;
        handle
            .file
            .lock()
            .expect("handle mutex poisoned")
            .flush()
            .map_err(PosixError::from)
    }

    fn delete(&self, handle: &Self::Handle, _scope: DeleteScope) -> Result<()> {
        let meta = fs::symlink_metadata(&handle.path).map_err(PosixError::from)?;
        if meta.is_dir() {
            fs::remove_dir(&handle.path).map_err(PosixError::from)
        } else {
            fs::remove_file(&handle.path).map_err(PosixError::from)
        }
    }

    fn change_name(&self, handle: &Self::Handle, new_uri: &str) -> Result<()> {
        fs::rename(&handle.path, path_of(new_uri)).map_err(PosixError::from)
    }

    fn attributes_set_by_handle(&self, handle: &Self::Handle, share_flags: u32) -> Result<()> {
        let file = handle.file.lock().expect("handle mutex poisoned");
        let mode = Mode::from_bits_truncate(share_flags & 0o777);
        nix::sys::stat::fchmod(&*file, mode).map_err(|e| PosixError::from_pal_errno(e as i32))
    }

    fn close(&self, _handle: Self::Handle) -> Result<()> {
        // Dropping the `File` inside `LocalHandle` closes the fd.
        Ok(())
    }
}
