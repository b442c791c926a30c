//! End-to-end scenarios against `LocalPal`, one test per literal scenario.

use chroot_fs::{ChrootFs, Checkpoint, LocalPal, OpenFlags, Whence};

fn fs() -> (ChrootFs<LocalPal>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (ChrootFs::new(LocalPal::new()), dir)
}

#[test]
fn create_write_stat() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    let (dent, handle) = fs.creat(&root, "a", 0o600).unwrap();
    let n = fs.write(&handle, b"hello").unwrap();
    assert_eq!(n, 5);

    let stat = fs.stat(&dent).unwrap();
    assert_eq!(stat.size, 5);
    assert_eq!(stat.nlink, 1);
    assert_eq!(stat.mode & 0o777, 0o600);
    assert_eq!(stat.mode & libc::S_IFMT as u32, libc::S_IFREG as u32);

    let host_meta = std::fs::metadata(dir.path().join("a")).unwrap();
    use std::os::unix::fs::PermissionsExt;
    assert_eq!(host_meta.permissions().mode() & 0o777, 0o600 | 0o400);
}

#[test]
fn seek_past_end_then_write_extends_size() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    let (_dent, handle) = fs.creat(&root, "a", 0o600).unwrap();
    let pos = fs.seek(&handle, 10, Whence::Set).unwrap();
    assert_eq!(pos, 10);
    let n = fs.write(&handle, b"x").unwrap();
    assert_eq!(n, 1);
    assert_eq!(handle.inode().size(), 11);
}

#[test]
fn rename_then_stat_old_and_new() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    let (dent, handle) = fs.creat(&root, "a", 0o600).unwrap();
    fs.write(&handle, b"hello").unwrap();
    fs.rename(&dent, &root, "b").unwrap();

    assert!(fs.lookup(&root, "a").is_err());
    let b = fs.lookup(&root, "b").unwrap();
    let stat = fs.stat(&b).unwrap();
    assert_eq!(stat.size, 5);
}

#[test]
fn unlink_with_open_handle_still_reads() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    let (dent, handle) = fs.creat(&root, "b", 0o600).unwrap();
    fs.write(&handle, b"hello").unwrap();
    fs.unlink(&dent).unwrap();

    fs.seek(&handle, 0, Whence::Set).unwrap();
    let mut buf = [0u8; 5];
    let n = fs.read(&handle, &mut buf).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf, b"hello");

    assert!(fs.lookup(&root, "b").is_err());
}

#[test]
fn chmod_updates_guest_perm_and_keeps_host_read_bit() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    let (dent, _handle) = fs.creat(&root, "b", 0o600).unwrap();
    fs.chmod(&dent, 0o400).unwrap();

    let stat = fs.stat(&dent).unwrap();
    assert_eq!(stat.mode & 0o777, 0o400);

    let host_meta = std::fs::metadata(dir.path().join("b")).unwrap();
    use std::os::unix::fs::PermissionsExt;
    assert_eq!(host_meta.permissions().mode() & 0o777, 0o400);
}

#[test]
fn checkpoint_round_trip_preserves_position_and_contents() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    let (_dent, handle) = fs.creat(&root, "b", 0o600).unwrap();
    fs.write(&handle, b"hello").unwrap();
    fs.seek(&handle, 0, Whence::Set).unwrap();

    let checkpoint = fs.checkout(&handle);
    assert!(matches!(checkpoint, Checkpoint::Reopen { .. }));
    let restored = fs.checkin(checkpoint).unwrap();
    assert_eq!(restored.pos(), 0);

    let mut buf = [0u8; 5];
    let n = fs.read(&restored, &mut buf).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf, b"hello");
}

#[test]
fn readdir_lists_created_entries() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    fs.creat(&root, "a", 0o600).unwrap();
    fs.mkdir(&root, "sub", 0o755).unwrap();

    let mut seen = Vec::new();
    fs.readdir(&root, |name, _dent| {
        seen.push(name.to_string());
        Ok(())
    })
    .unwrap();
    seen.sort();
    assert_eq!(seen, vec!["a".to_string(), "sub".to_string()]);
}

#[test]
fn open_requires_prior_lookup_flags_round_trip() {
    let (fs, dir) = fs();
    let root = fs.mount(format!("file:{}", dir.path().display())).unwrap();
    fs.creat(&root, "a", 0o600).unwrap();
    let dent = fs.lookup(&root, "a").unwrap();
    let handle = fs.open(&dent, OpenFlags(libc::O_RDWR)).unwrap();
    assert!(handle.is_open());
}
