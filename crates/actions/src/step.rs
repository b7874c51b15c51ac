//! Step definitions.

use crate::error::{Error, Result};
use crate::template::{self, TemplateContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of an [`ActionStep`], for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Fetch a URL into a file.
    Download,
    /// Run a program.
    Command,
    /// Write literal content to a file.
    Write,
    /// Delete a path.
    Remove,
    /// Create a directory tree.
    Mkdir,
    /// Change permission bits.
    Chmod,
    /// Change ownership.
    Chown,
    /// Create a symbolic link.
    Symlink,
    /// Copy a file.
    Copy,
}

impl ActionKind {
    /// Lowercase name used in definition files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Command => "command",
            Self::Write => "write",
            Self::Remove => "remove",
            Self::Mkdir => "mkdir",
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Symlink => "symlink",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed operation in a provisioning sequence.
///
/// Every string field is a template rendered against the operation's
/// [`TemplateContext`] just before the step runs.
///
/// In a definition file:
///
/// ```toml
/// [[steps]]
/// action = "write"
/// dest = "{{SourcesPath}}"
/// content = "deb [signed-by={{KeyPath}}] {{URL}} {{Channel}} {{Component}}"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase", deny_unknown_fields)]
pub enum ActionStep {
    /// Fetch `source` and place it atomically at `dest`.
    Download {
        /// URL to fetch.
        source: String,
        /// Destination file.
        dest: String,
    },
    /// Run `exec` with `args`.
    Command {
        /// Program name or path.
        exec: String,
        /// Arguments, one per element.
        #[serde(default)]
        args: Vec<String>,
    },
    /// Write `content` to `dest` atomically.
    Write {
        /// Destination file.
        dest: String,
        /// File content.
        content: String,
    },
    /// Delete `dest` (file, symlink or directory tree).
    Remove {
        /// Path to delete.
        dest: String,
    },
    /// Create `dest` and any missing parents.
    Mkdir {
        /// Directory to create.
        dest: String,
    },
    /// Set the permission bits of `dest`.
    Chmod {
        /// Target path.
        dest: String,
        /// Octal mode such as `0644`.
        mode: String,
    },
    /// Change the owner of `dest`.
    Chown {
        /// Target path.
        dest: String,
        /// `user` or `user:group`.
        owner: String,
    },
    /// Point `dest` at `source`.
    Symlink {
        /// Link target.
        source: String,
        /// Link location.
        dest: String,
    },
    /// Copy `source` to `dest` atomically.
    Copy {
        /// File to copy.
        source: String,
        /// Destination file.
        dest: String,
    },
}

impl ActionStep {
    /// The step's kind.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Download { .. } => ActionKind::Download,
            Self::Command { .. } => ActionKind::Command,
            Self::Write { .. } => ActionKind::Write,
            Self::Remove { .. } => ActionKind::Remove,
            Self::Mkdir { .. } => ActionKind::Mkdir,
            Self::Chmod { .. } => ActionKind::Chmod,
            Self::Chown { .. } => ActionKind::Chown,
            Self::Symlink { .. } => ActionKind::Symlink,
            Self::Copy { .. } => ActionKind::Copy,
        }
    }

    /// Named fields that must be non-empty, paired with their values.
    fn required(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Download { source, dest }
            | Self::Symlink { source, dest }
            | Self::Copy { source, dest } => {
                vec![("source", source.as_str()), ("dest", dest.as_str())]
            }
            Self::Command { exec, .. } => vec![("exec", exec.as_str())],
            Self::Write { dest, .. } | Self::Remove { dest } | Self::Mkdir { dest } => {
                vec![("dest", dest.as_str())]
            }
            Self::Chmod { dest, mode } => vec![("dest", dest.as_str()), ("mode", mode.as_str())],
            Self::Chown { dest, owner } => {
                vec![("dest", dest.as_str()), ("owner", owner.as_str())]
            }
        }
    }

    /// Every template-bearing field.
    fn templates(&self) -> Vec<&str> {
        match self {
            Self::Command { exec, args } => {
                let mut fields = vec![exec.as_str()];
                fields.extend(args.iter().map(String::as_str));
                fields
            }
            Self::Write { dest, content } => vec![dest.as_str(), content.as_str()],
            other => other.required().into_iter().map(|(_, v)| v).collect(),
        }
    }

    /// Check the step without executing it.
    ///
    /// Required fields must be non-empty, every template must parse and
    /// reference known variables, and a literal chmod mode must be octal.
    pub fn validate(&self, index: usize) -> Result<()> {
        let invalid = |message: String| Error::InvalidStep {
            index,
            action: self.kind(),
            message,
        };

        for (field, value) in self.required() {
            if value.trim().is_empty() {
                return Err(invalid(format!("'{field}' is required")));
            }
        }
        for text in self.templates() {
            template::check(text).map_err(|e| invalid(e.to_string()))?;
        }
        if let Self::Chmod { mode, .. } = self
            && !template::has_markers(mode)
        {
            parse_mode(mode).map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }

    /// A copy of this step with every field rendered.
    pub fn render(&self, ctx: &TemplateContext) -> Result<Self> {
        let r = |text: &str| ctx.render(text).map_err(Error::from);
        Ok(match self {
            Self::Download { source, dest } => Self::Download {
                source: r(source)?,
                dest: r(dest)?,
            },
            Self::Command { exec, args } => Self::Command {
                exec: r(exec)?,
                args: args.iter().map(|a| r(a)).collect::<Result<_>>()?,
            },
            Self::Write { dest, content } => Self::Write {
                dest: r(dest)?,
                content: r(content)?,
            },
            Self::Remove { dest } => Self::Remove { dest: r(dest)? },
            Self::Mkdir { dest } => Self::Mkdir { dest: r(dest)? },
            Self::Chmod { dest, mode } => Self::Chmod {
                dest: r(dest)?,
                mode: r(mode)?,
            },
            Self::Chown { dest, owner } => Self::Chown {
                dest: r(dest)?,
                owner: r(owner)?,
            },
            Self::Symlink { source, dest } => Self::Symlink {
                source: r(source)?,
                dest: r(dest)?,
            },
            Self::Copy { source, dest } => Self::Copy {
                source: r(source)?,
                dest: r(dest)?,
            },
        })
    }

    /// One-line summary for progress output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Download { source, dest } => format!("download {source} -> {dest}"),
            Self::Command { exec, args } => cmdrun::display_command(exec, args),
            Self::Write { dest, .. } => format!("write {dest}"),
            Self::Remove { dest } => format!("remove {dest}"),
            Self::Mkdir { dest } => format!("mkdir {dest}"),
            Self::Chmod { dest, mode } => format!("chmod {mode} {dest}"),
            Self::Chown { dest, owner } => format!("chown {owner} {dest}"),
            Self::Symlink { source, dest } => format!("symlink {dest} -> {source}"),
            Self::Copy { source, dest } => format!("copy {source} -> {dest}"),
        }
    }
}

/// Parse an octal permission string such as `644`, `0644` or `0o755`.
pub fn parse_mode(mode: &str) -> Result<u32> {
    let digits = mode.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    if digits.is_empty() || digits.len() > 4 {
        return Err(Error::InvalidMode(mode.to_string()));
    }
    u32::from_str_radix(digits, 8).map_err(|_| Error::InvalidMode(mode.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Steps {
        steps: Vec<ActionStep>,
    }

    #[test]
    fn test_deserialize_tagged_steps() {
        let doc: Steps = toml::from_str(
            r#"
[[steps]]
action = "download"
source = "{{KeyURL}}"
dest = "{{TempKeyPath}}"

[[steps]]
action = "command"
exec = "gpg"
args = ["--dearmor", "-o", "{{KeyPath}}", "{{TempKeyPath}}"]

[[steps]]
action = "chmod"
dest = "{{KeyPath}}"
mode = "0644"
"#,
        )
        .unwrap();

        assert_eq!(doc.steps.len(), 3);
        assert_eq!(doc.steps[0].kind(), ActionKind::Download);
        assert!(matches!(&doc.steps[1], ActionStep::Command { args, .. } if args.len() == 4));
        assert_eq!(doc.steps[2].kind(), ActionKind::Chmod);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: std::result::Result<Steps, _> =
            toml::from_str("[[steps]]\naction = \"format\"\ndest = \"/\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unrelated_field_is_rejected() {
        let result: std::result::Result<Steps, _> =
            toml::from_str("[[steps]]\naction = \"remove\"\ndest = \"/tmp/x\"\ncontent = \"y\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_command_args_default_to_empty() {
        let doc: Steps = toml::from_str("[[steps]]\naction = \"command\"\nexec = \"true\"\n").unwrap();
        assert_eq!(
            doc.steps[0],
            ActionStep::Command {
                exec: "true".to_string(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_validate_empty_field() {
        let step = ActionStep::Write {
            dest: "  ".to_string(),
            content: "x".to_string(),
        };
        let err = step.validate(4).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidStep { index: 4, action: ActionKind::Write, .. }
        ));
    }

    #[test]
    fn test_validate_template_syntax() {
        let step = ActionStep::Command {
            exec: "echo".to_string(),
            args: vec!["{{Name".to_string()],
        };
        assert!(step.validate(0).is_err());
    }

    #[test]
    fn test_validate_mode() {
        let bad = ActionStep::Chmod {
            dest: "/tmp/x".to_string(),
            mode: "rwx".to_string(),
        };
        assert!(bad.validate(0).is_err());

        let templated = ActionStep::Chmod {
            dest: "/tmp/x".to_string(),
            mode: "{{Component}}".to_string(),
        };
        assert!(templated.validate(0).is_ok());
    }

    #[test]
    fn test_write_content_may_be_empty() {
        let step = ActionStep::Write {
            dest: "/tmp/empty".to_string(),
            content: String::new(),
        };
        assert!(step.validate(0).is_ok());
    }

    #[test]
    fn test_render_all_fields() {
        let ctx = TemplateContext::builder()
            .name("docker")
            .key_path("/etc/apt/keyrings/docker.gpg")
            .build();
        let step = ActionStep::Symlink {
            source: "{{KeyPath}}".to_string(),
            dest: "/tmp/{{Name}}.gpg".to_string(),
        };
        assert_eq!(
            step.render(&ctx).unwrap(),
            ActionStep::Symlink {
                source: "/etc/apt/keyrings/docker.gpg".to_string(),
                dest: "/tmp/docker.gpg".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
        assert_eq!(parse_mode("0o600").unwrap(), 0o600);
        assert!(parse_mode("0999").is_err());
        assert!(parse_mode("").is_err());
        assert!(parse_mode("01234").is_err());
    }

    #[test]
    fn test_describe_command() {
        let step = ActionStep::Command {
            exec: "apt-get".to_string(),
            args: vec!["install".to_string(), "-y".to_string()],
        };
        assert_eq!(step.describe(), "apt-get install -y");
    }
}
