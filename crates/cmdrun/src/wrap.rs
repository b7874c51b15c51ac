//! Privilege wrapping.
//!
//! Turns a program, its argument vector and a [`Privilege`] into the actual
//! process invocation. Arguments stay a vector on POSIX; the Windows RunAs
//! wrapper has to go through PowerShell, so each argument is quoted there.

use crate::error::{Error, Result};
use crate::types::{Privilege, display_command};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;

/// A fully wrapped process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to spawn.
    pub program: String,
    /// Arguments to pass.
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_command(&self.program, &self.args))
    }
}

/// Wrap a command for the requested privilege.
///
/// `path` is forwarded explicitly through `env` when the command crosses a
/// sudo boundary, since sudo's `secure_path` would otherwise reset it.
/// When `already_root` is set, elevation is a no-op.
pub fn wrap(
    program: &str,
    args: &[String],
    privilege: &Privilege,
    env: &BTreeMap<String, String>,
    path: &OsStr,
    already_root: bool,
) -> Result<Invocation> {
    match privilege {
        Privilege::Current => Ok(direct(program, args)),
        Privilege::Elevated if already_root => Ok(direct(program, args)),
        Privilege::Elevated => elevate(program, args, env, path),
        Privilege::User(user) => switch_user(user, program, args, env, path),
    }
}

fn direct(program: &str, args: &[String]) -> Invocation {
    Invocation {
        program: program.to_string(),
        args: args.to_vec(),
    }
}

#[cfg(not(windows))]
fn env_prefix(env: &BTreeMap<String, String>, path: &OsStr) -> Vec<String> {
    let mut out = vec!["env".to_string(), format!("PATH={}", path.to_string_lossy())];
    out.extend(env.iter().map(|(k, v)| format!("{k}={v}")));
    out
}

#[cfg(not(windows))]
fn elevate(
    program: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
    path: &OsStr,
) -> Result<Invocation> {
    let mut wrapped = env_prefix(env, path);
    wrapped.push(program.to_string());
    wrapped.extend(args.iter().cloned());
    Ok(Invocation {
        program: "sudo".to_string(),
        args: wrapped,
    })
}

#[cfg(not(windows))]
fn switch_user(
    user: &str,
    program: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
    path: &OsStr,
) -> Result<Invocation> {
    if user.is_empty() {
        return Err(Error::Unsupported("as-user execution needs a user name".to_string()));
    }
    let mut wrapped = vec!["-u".to_string(), user.to_string(), "-H".to_string()];
    wrapped.extend(env_prefix(env, path));
    wrapped.push(program.to_string());
    wrapped.extend(args.iter().cloned());
    Ok(Invocation {
        program: "sudo".to_string(),
        args: wrapped,
    })
}

/// Quote a word for a PowerShell single-quoted string literal.
pub fn ps_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', "''"))
}

#[cfg(windows)]
fn elevate(
    program: &str,
    args: &[String],
    _env: &BTreeMap<String, String>,
    _path: &OsStr,
) -> Result<Invocation> {
    let mut script = format!("$p = Start-Process -FilePath {}", ps_quote(program));
    if !args.is_empty() {
        let list: Vec<String> = args.iter().map(|a| ps_quote(a)).collect();
        script.push_str(" -ArgumentList ");
        script.push_str(&list.join(","));
    }
    script.push_str(" -Verb RunAs -Wait -PassThru; exit $p.ExitCode");
    Ok(Invocation {
        program: "powershell".to_string(),
        args: vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            script,
        ],
    })
}

#[cfg(windows)]
fn switch_user(
    user: &str,
    _program: &str,
    _args: &[String],
    _env: &BTreeMap<String, String>,
    _path: &OsStr,
) -> Result<Invocation> {
    Err(Error::Unsupported(format!(
        "running as user '{user}' is not supported on Windows"
    )))
}

/// Whether the current process already has administrator rights.
#[cfg(unix)]
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Whether the current process already has administrator rights.
#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_current_is_passthrough() {
        let inv = wrap(
            "apt-get",
            &args(&["install", "-y", "curl"]),
            &Privilege::Current,
            &BTreeMap::new(),
            OsStr::new("/usr/bin"),
            false,
        )
        .unwrap();
        assert_eq!(inv.program, "apt-get");
        assert_eq!(inv.args, args(&["install", "-y", "curl"]));
    }

    #[test]
    fn test_elevated_as_root_is_passthrough() {
        let inv = wrap(
            "apt-get",
            &args(&["update"]),
            &Privilege::Elevated,
            &BTreeMap::new(),
            OsStr::new("/usr/bin"),
            true,
        )
        .unwrap();
        assert_eq!(inv.program, "apt-get");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_elevated_wraps_with_sudo_env() {
        let mut env = BTreeMap::new();
        env.insert("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string());

        let inv = wrap(
            "apt-get",
            &args(&["install", "-y", "my package"]),
            &Privilege::Elevated,
            &env,
            OsStr::new("/usr/bin:/bin"),
            false,
        )
        .unwrap();

        assert_eq!(inv.program, "sudo");
        assert_eq!(
            inv.args,
            args(&[
                "env",
                "PATH=/usr/bin:/bin",
                "DEBIAN_FRONTEND=noninteractive",
                "apt-get",
                "install",
                "-y",
                "my package",
            ])
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_as_user_wraps_with_sudo_u() {
        let inv = wrap(
            "makepkg",
            &args(&["-si"]),
            &Privilege::User("builder".to_string()),
            &BTreeMap::new(),
            OsStr::new("/usr/bin"),
            true,
        )
        .unwrap();
        assert_eq!(inv.program, "sudo");
        assert_eq!(
            inv.args,
            args(&["-u", "builder", "-H", "env", "PATH=/usr/bin", "makepkg", "-si"])
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_as_user_requires_name() {
        let err = wrap(
            "id",
            &[],
            &Privilege::User(String::new()),
            &BTreeMap::new(),
            OsStr::new(""),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_ps_quote_doubles_single_quotes() {
        assert_eq!(ps_quote("it's"), "'it''s'");
        assert_eq!(ps_quote("C:\\Program Files\\x.exe"), "'C:\\Program Files\\x.exe'");
    }

    #[test]
    fn test_invocation_display() {
        let inv = Invocation {
            program: "sudo".to_string(),
            args: args(&["rm", "-f", "/etc/apt/sources.list.d/my repo.list"]),
        };
        assert_eq!(inv.to_string(), "sudo rm -f '/etc/apt/sources.list.d/my repo.list'");
    }
}
