//! Filesystem primitives behind the file-mutating steps.
//!
//! Each primitive tries the direct operation first. On a permission error it
//! retries through an elevated command, so protected locations such as
//! `/etc/apt/sources.list.d` work without running the whole tool as root.
//! Writes go to a temporary file first and are moved into place, so a reader
//! never observes a half-written file.

use crate::error::{Error, Result};
use cmdrun::{CommandExecutor, CommandSpec};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Mode given to new files when nothing else applies.
#[cfg_attr(not(unix), allow(dead_code))]
const DEFAULT_FILE_MODE: u32 = 0o644;

// ============================================================================
// Elevated fallbacks
// ============================================================================

/// Operations that can be replayed through an elevated command.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(not(unix), allow(dead_code))]
enum Privileged<'a> {
    Move { from: &'a Path, to: &'a Path },
    Install { from: &'a Path, to: &'a Path, mode: u32 },
    Remove { path: &'a Path, recursive: bool },
    MakeDir(&'a Path),
    Chmod { path: &'a Path, mode: u32 },
    Chown { path: &'a Path, owner: &'a str },
    Symlink { source: &'a Path, dest: &'a Path },
    Copy { source: &'a Path, dest: &'a Path },
}

#[cfg(unix)]
fn privileged_command(op: Privileged<'_>) -> Result<CommandSpec> {
    let spec = match op {
        Privileged::Move { from, to } => CommandSpec::new("mv")
            .arg("-f")
            .arg(lossy(from))
            .arg(lossy(to)),
        Privileged::Install { from, to, mode } => CommandSpec::new("install")
            .arg("-m")
            .arg(format!("{mode:04o}"))
            .args(["-o", "0", "-g", "0"])
            .arg(lossy(from))
            .arg(lossy(to)),
        Privileged::Remove { path, recursive } => CommandSpec::new("rm")
            .arg(if recursive { "-rf" } else { "-f" })
            .arg(lossy(path)),
        Privileged::MakeDir(path) => CommandSpec::new("mkdir").arg("-p").arg(lossy(path)),
        Privileged::Chmod { path, mode } => CommandSpec::new("chmod")
            .arg(format!("{mode:04o}"))
            .arg(lossy(path)),
        Privileged::Chown { path, owner } => CommandSpec::new("chown").arg(owner).arg(lossy(path)),
        Privileged::Symlink { source, dest } => CommandSpec::new("ln")
            .arg("-sfn")
            .arg(lossy(source))
            .arg(lossy(dest)),
        Privileged::Copy { source, dest } => CommandSpec::new("cp")
            .arg("-f")
            .arg(lossy(source))
            .arg(lossy(dest)),
    };
    Ok(spec.elevated(true))
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(windows)]
fn privileged_command(op: Privileged<'_>) -> Result<CommandSpec> {
    use cmdrun::wrap::ps_quote;

    let q = |p: &Path| ps_quote(&lossy(p));
    let script = match op {
        Privileged::Move { from, to } => {
            format!("Move-Item -Force -LiteralPath {} -Destination {}", q(from), q(to))
        }
        Privileged::Install { from, to, .. } => {
            format!("Copy-Item -Force -LiteralPath {} -Destination {}", q(from), q(to))
        }
        Privileged::Remove { path, .. } => {
            format!("Remove-Item -Recurse -Force -LiteralPath {}", q(path))
        }
        Privileged::MakeDir(path) => {
            format!("New-Item -ItemType Directory -Force -Path {} | Out-Null", q(path))
        }
        Privileged::Symlink { source, dest } => format!(
            "New-Item -ItemType SymbolicLink -Force -Path {} -Target {} | Out-Null",
            q(dest),
            q(source)
        ),
        Privileged::Copy { source, dest } => {
            format!("Copy-Item -Force -LiteralPath {} -Destination {}", q(source), q(dest))
        }
        Privileged::Chmod { .. } | Privileged::Chown { .. } => {
            return Err(Error::Unsupported(
                "POSIX ownership and permission bits".to_string(),
            ));
        }
    };
    Ok(CommandSpec::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", script.as_str()])
        .elevated(true))
}

fn run_privileged(op: Privileged<'_>, exec: &dyn CommandExecutor) -> Result<()> {
    let spec = privileged_command(op)?;
    log::info!("retrying with elevation: {spec}");
    exec.execute(&spec)?;
    Ok(())
}

fn denied(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied
}

fn parent_of(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

// ============================================================================
// Primitives
// ============================================================================

/// Create `path` and its missing parents.
pub fn make_dir(path: &Path, exec: &dyn CommandExecutor) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if denied(&e) => run_privileged(Privileged::MakeDir(path), exec),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Atomically replace `dest` with `bytes`.
///
/// The new file gets `mode` if given, else the mode of the file it replaces,
/// else `0644`.
pub fn write_file(
    dest: &Path,
    bytes: &[u8],
    mode: Option<u32>,
    exec: &dyn CommandExecutor,
) -> Result<()> {
    let parent = parent_of(dest);
    make_dir(parent, exec)?;
    let mode = target_mode(dest, mode);

    match NamedTempFile::new_in(parent) {
        Ok(tmp) => {
            let tmp = fill(tmp, bytes, mode)?;
            match tmp.persist(dest) {
                Ok(_) => Ok(()),
                Err(e) if denied(&e.error) => place_elevated(dest, bytes, mode, exec),
                Err(e) => Err(Error::io(dest, e.error)),
            }
        }
        Err(e) if denied(&e) => place_elevated(dest, bytes, mode, exec),
        Err(e) => Err(Error::io(parent, e)),
    }
}

/// Place `bytes` at `dest` through elevated commands.
///
/// The content is staged in the system temp dir, installed root-owned next
/// to `dest`, then renamed over it. The rename stays on one filesystem, so
/// `dest` is replaced atomically.
fn place_elevated(
    dest: &Path,
    bytes: &[u8],
    mode: Option<u32>,
    exec: &dyn CommandExecutor,
) -> Result<()> {
    let mode = mode.unwrap_or(DEFAULT_FILE_MODE);
    let staging = std::env::temp_dir();
    let tmp = NamedTempFile::new().map_err(|e| Error::io(&staging, e))?;
    let tmp = fill(tmp, bytes, Some(mode))?;
    // Removed on drop; the elevated install only copies it.
    let staged = tmp.into_temp_path();

    let sibling = sibling_of(dest);
    run_privileged(
        Privileged::Install {
            from: &staged,
            to: &sibling,
            mode,
        },
        exec,
    )?;
    let moved = run_privileged(
        Privileged::Move {
            from: &sibling,
            to: dest,
        },
        exec,
    );
    if moved.is_err() {
        let cleanup = Privileged::Remove {
            path: &sibling,
            recursive: false,
        };
        if let Err(e) = run_privileged(cleanup, exec) {
            log::warn!("could not remove {}: {e}", sibling.display());
        }
    }
    moved
}

/// Hidden staging name in the same directory as `dest`.
fn sibling_of(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_string_lossy());
    parent_of(dest).join(format!(".{name}.outfit-{}", std::process::id()))
}

fn fill(mut tmp: NamedTempFile, bytes: &[u8], mode: Option<u32>) -> Result<NamedTempFile> {
    let path = tmp.path().to_path_buf();
    tmp.write_all(bytes).map_err(|e| Error::io(&path, e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(&path, e))?;
    set_file_mode(tmp.as_file(), mode).map_err(|e| Error::io(&path, e))?;
    Ok(tmp)
}

#[cfg(unix)]
fn target_mode(dest: &Path, explicit: Option<u32>) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;

    explicit.or_else(|| {
        Some(
            fs::metadata(dest)
                .map(|m| m.permissions().mode() & 0o7777)
                .unwrap_or(DEFAULT_FILE_MODE),
        )
    })
}

#[cfg(not(unix))]
fn target_mode(_dest: &Path, explicit: Option<u32>) -> Option<u32> {
    explicit
}

#[cfg(unix)]
fn set_file_mode(file: &fs::File, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => file.set_permissions(fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn set_file_mode(_file: &fs::File, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// Copy `source` to `dest` atomically, keeping the source's mode.
pub fn copy_file(source: &Path, dest: &Path, exec: &dyn CommandExecutor) -> Result<()> {
    match fs::read(source) {
        Ok(bytes) => write_file(dest, &bytes, source_mode(source), exec),
        Err(e) if denied(&e) => {
            make_dir(parent_of(dest), exec)?;
            run_privileged(Privileged::Copy { source, dest }, exec)
        }
        Err(e) => Err(Error::io(source, e)),
    }
}

#[cfg(unix)]
fn source_mode(source: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(source)
        .ok()
        .map(|m| m.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn source_mode(_source: &Path) -> Option<u32> {
    None
}

/// Delete a file, symlink or directory tree. An absent path is success.
pub fn remove(path: &Path, exec: &dyn CommandExecutor) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} already absent", path.display());
            return Ok(());
        }
        Err(e) if denied(&e) => {
            return run_privileged(
                Privileged::Remove {
                    path,
                    recursive: true,
                },
                exec,
            );
        }
        Err(e) => return Err(Error::io(path, e)),
    };

    let recursive = meta.is_dir();
    let result = if recursive {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if denied(&e) => run_privileged(Privileged::Remove { path, recursive }, exec),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Set the permission bits of `path`.
#[cfg(unix)]
pub fn chmod(path: &Path, mode: u32, exec: &dyn CommandExecutor) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        Ok(()) => Ok(()),
        Err(e) if denied(&e) => run_privileged(Privileged::Chmod { path, mode }, exec),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Set the permission bits of `path`.
#[cfg(not(unix))]
pub fn chmod(path: &Path, mode: u32, _exec: &dyn CommandExecutor) -> Result<()> {
    if !path.exists() {
        return Err(Error::io(
            path,
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        ));
    }
    log::warn!(
        "ignoring chmod {mode:04o} on {}: no POSIX permission bits",
        path.display()
    );
    Ok(())
}

/// Change the owner of `path`. Always runs elevated.
pub fn chown(path: &Path, owner: &str, exec: &dyn CommandExecutor) -> Result<()> {
    run_privileged(Privileged::Chown { path, owner }, exec)
}

/// Point `dest` at `source`, replacing an existing symlink.
///
/// A regular file or directory at `dest` is never replaced.
pub fn symlink(source: &Path, dest: &Path, exec: &dyn CommandExecutor) -> Result<()> {
    make_dir(parent_of(dest), exec)?;

    if let Ok(meta) = fs::symlink_metadata(dest) {
        if !meta.file_type().is_symlink() {
            return Err(Error::io(
                dest,
                io::Error::new(io::ErrorKind::AlreadyExists, "exists and is not a symlink"),
            ));
        }
        if fs::read_link(dest).is_ok_and(|target| target == source) {
            log::debug!("{} already points at {}", dest.display(), source.display());
            return Ok(());
        }
        if let Err(e) = fs::remove_file(dest) {
            return if denied(&e) {
                run_privileged(Privileged::Symlink { source, dest }, exec)
            } else {
                Err(Error::io(dest, e))
            };
        }
    }

    match create_symlink(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if denied(&e) => run_privileged(Privileged::Symlink { source, dest }, exec),
        Err(e) => Err(Error::io(dest, e)),
    }
}

#[cfg(unix)]
fn create_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
fn create_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, dest)
    } else {
        std::os::windows::fs::symlink_file(source, dest)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use cmdrun::RecordingExecutor;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_write_creates_parents_and_default_mode() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a/b/c.list");
        let exec = RecordingExecutor::new();

        write_file(&dest, b"deb x y z\n", None, &exec).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "deb x y z\n");
        assert_eq!(mode_of(&dest), DEFAULT_FILE_MODE);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_write_replaces_and_keeps_mode() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("conf");
        fs::write(&dest, "old").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o600)).unwrap();

        write_file(&dest, b"new", None, &RecordingExecutor::new()).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        assert_eq!(mode_of(&dest), 0o600);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("only");
        write_file(&dest, b"x", None, &RecordingExecutor::new()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_success() {
        let dir = TempDir::new().unwrap();
        let exec = RecordingExecutor::new();
        remove(&dir.path().join("missing"), &exec).unwrap();
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_remove_file_and_tree() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        let tree = dir.path().join("t/u");
        fs::write(&file, "x").unwrap();
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("g"), "y").unwrap();

        let exec = RecordingExecutor::new();
        remove(&file, &exec).unwrap();
        remove(&dir.path().join("t"), &exec).unwrap();

        assert!(!file.exists());
        assert!(!dir.path().join("t").exists());
    }

    #[test]
    fn test_chmod_sets_bits() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("script");
        fs::write(&file, "#!/bin/sh\n").unwrap();

        chmod(&file, 0o755, &RecordingExecutor::new()).unwrap();
        assert_eq!(mode_of(&file), 0o755);
    }

    #[test]
    fn test_chown_always_goes_through_elevated_command() {
        let exec = RecordingExecutor::new();
        chown(Path::new("/opt/tool"), "root:root", &exec).unwrap();

        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].display(), "chown root:root /opt/tool");
        assert!(calls[0].privilege.is_elevated());
    }

    #[test]
    fn test_symlink_create_and_replace() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        let link = dir.path().join("bin/tool");
        fs::write(&first, "1").unwrap();
        fs::write(&second, "2").unwrap();
        let exec = RecordingExecutor::new();

        symlink(&first, &link, &exec).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), first);

        symlink(&second, &link, &exec).unwrap();
        assert_eq!(fs::read_to_string(&link).unwrap(), "2");
    }

    #[test]
    fn test_symlink_refuses_to_replace_regular_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("real");
        fs::write(&dest, "keep").unwrap();

        let err = symlink(Path::new("/bin/sh"), &dest, &RecordingExecutor::new()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "keep");
    }

    #[test]
    fn test_copy_keeps_source_mode() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src.sh");
        let dest = dir.path().join("out/dst.sh");
        fs::write(&source, "echo hi").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o750)).unwrap();

        copy_file(&source, &dest, &RecordingExecutor::new()).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "echo hi");
        assert_eq!(mode_of(&dest), 0o750);
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let err = copy_file(
            &dir.path().join("nope"),
            &dir.path().join("dst"),
            &RecordingExecutor::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_privileged_commands() {
        let spec = privileged_command(Privileged::Chmod {
            path: Path::new("/etc/x"),
            mode: 0o644,
        })
        .unwrap();
        assert_eq!(spec.display(), "chmod 0644 /etc/x");
        assert!(spec.privilege.is_elevated());

        let spec = privileged_command(Privileged::Symlink {
            source: Path::new("/opt/a"),
            dest: Path::new("/usr/local/bin/a"),
        })
        .unwrap();
        assert_eq!(spec.display(), "ln -sfn /opt/a /usr/local/bin/a");
    }

    #[test]
    fn test_elevated_placement_stages_next_to_destination() {
        let exec = RecordingExecutor::new();
        let dest = Path::new("/etc/apt/sources.list.d/tool.list");

        place_elevated(dest, b"deb https://example.com stable main\n", Some(0o640), &exec).unwrap();

        let calls = exec.calls();
        assert_eq!(calls.len(), 2);
        let sibling = format!(
            "/etc/apt/sources.list.d/.tool.list.outfit-{}",
            std::process::id()
        );

        assert_eq!(calls[0].program, "install");
        assert_eq!(calls[0].args[..6], ["-m", "0640", "-o", "0", "-g", "0"]);
        assert_eq!(calls[0].args[7], sibling);
        assert!(calls[0].privilege.is_elevated());

        assert_eq!(calls[1].display(), format!("mv -f {sibling} {}", dest.display()));
        assert!(calls[1].privilege.is_elevated());
    }

    #[test]
    fn test_failed_elevated_move_cleans_up_sibling() {
        let exec = RecordingExecutor::new();
        exec.fail("mv", "mv: cannot move");

        let dest = Path::new("/etc/tool.conf");
        let err = place_elevated(dest, b"x", None, &exec).unwrap_err();
        assert!(matches!(err, Error::Command(_)));

        let lines = exec.command_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("install -m 0644 -o 0 -g 0 "));
        assert_eq!(
            lines[2],
            format!("rm -f /etc/.tool.conf.outfit-{}", std::process::id())
        );
    }
}
