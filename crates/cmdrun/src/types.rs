//! Core types for command execution.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which identity a command runs as.
///
/// Elevation and as-user execution are mutually exclusive: a spec holds
/// exactly one of them, and the last builder call wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Privilege {
    /// Run as the invoking user.
    #[default]
    Current,
    /// Run with escalated privileges (sudo on POSIX, RunAs on Windows).
    Elevated,
    /// Run as another named user.
    User(String),
}

impl Privilege {
    /// Whether this privilege escalates to an administrator.
    #[must_use]
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Elevated)
    }
}

/// A single logical command to execute.
///
/// # Example
///
/// ```
/// use cmdrun::CommandSpec;
///
/// let spec = CommandSpec::new("apt-get")
///     .args(["install", "-y", "curl"])
///     .elevated(true)
///     .env("DEBIAN_FRONTEND", "noninteractive");
///
/// assert_eq!(spec.display(), "apt-get install -y curl");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Argument vector, passed through without shell interpretation.
    pub args: Vec<String>,
    /// Identity to run as.
    pub privilege: Privilege,
    /// Attach stdin/stdout/stderr to the controlling terminal.
    pub interactive: bool,
    /// Capture stdout and return it in [`CommandOutput`].
    pub capture: bool,
    /// Extra environment variables for the child.
    pub env: BTreeMap<String, String>,
    /// Kill the child after this long.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run elevated (`true`) or as the current user (`false`).
    #[must_use]
    pub fn elevated(mut self, elevated: bool) -> Self {
        self.privilege = if elevated {
            Privilege::Elevated
        } else {
            Privilege::Current
        };
        self
    }

    /// Run as another user.
    #[must_use]
    pub fn as_user(mut self, user: impl Into<String>) -> Self {
        self.privilege = Privilege::User(user.into());
        self
    }

    /// Attach to the terminal.
    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Capture standard output.
    #[must_use]
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables for the child.
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Human-readable command line, for logs and error messages only.
    #[must_use]
    pub fn display(&self) -> String {
        display_command(&self.program, &self.args)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Render a command line, single-quoting arguments that need it.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut line = quote_for_display(program);
    for arg in args {
        line.push(' ');
        line.push_str(&quote_for_display(arg));
    }
    line
}

fn quote_for_display(word: &str) -> String {
    let plain = !word.is_empty()
        && word.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | '+' | ',')
        });
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (always zero or `None` for a successful run).
    pub code: Option<i32>,
    /// Captured stdout; empty unless capture was requested.
    pub stdout: String,
    /// Captured stderr; empty in interactive mode.
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout with surrounding whitespace removed.
    #[must_use]
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Run-wide settings consumed by the [`Runner`](crate::Runner).
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    /// Send non-captured stdout to the caller's stdout instead of the log.
    pub debug: bool,
    /// Run every command interactively.
    pub interactive: bool,
    /// Promote commands that run as the current user to elevated.
    pub elevate_by_default: bool,
    /// Append non-captured stdout here.
    pub log_file: Option<PathBuf>,
    /// Deadline for commands that do not set their own.
    pub default_timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args_and_env() {
        let spec = CommandSpec::new("brew")
            .arg("install")
            .args(["git", "curl"])
            .env("HOMEBREW_NO_AUTO_UPDATE", "1")
            .envs([("A", "1"), ("B", "2")]);

        assert_eq!(spec.program, "brew");
        assert_eq!(spec.args, vec!["install", "git", "curl"]);
        assert_eq!(spec.env.len(), 3);
        assert_eq!(spec.privilege, Privilege::Current);
    }

    #[test]
    fn test_last_privilege_call_wins() {
        let spec = CommandSpec::new("id").elevated(true).as_user("nobody");
        assert_eq!(spec.privilege, Privilege::User("nobody".to_string()));

        let spec = CommandSpec::new("id").as_user("nobody").elevated(true);
        assert_eq!(spec.privilege, Privilege::Elevated);
        assert!(spec.privilege.is_elevated());
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new("echo").args(["hello world", "plain", "it's"]);
        assert_eq!(spec.display(), r"echo 'hello world' plain 'it'\''s'");
    }

    #[test]
    fn test_display_quotes_empty_argument() {
        let spec = CommandSpec::new("printf").arg("");
        assert_eq!(spec.to_string(), "printf ''");
    }

    #[test]
    fn test_stdout_trimmed() {
        let output = CommandOutput {
            code: Some(0),
            stdout: "  14.2\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.stdout_trimmed(), "14.2");
    }
}
