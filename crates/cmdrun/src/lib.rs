//! # cmdrun
//!
//! The shared execution primitive: runs one logical command, optionally
//! elevated, as another user, or attached to the terminal, with an enhanced
//! `PATH` and consistent output handling.
//!
//! ## Output handling
//!
//! | Mode                  | stdout                         | stderr   |
//! |-----------------------|--------------------------------|----------|
//! | interactive           | terminal                       | terminal |
//! | capture               | returned in [`CommandOutput`]  | captured |
//! | debug                 | caller's stdout                | captured |
//! | log file configured   | appended to the log file       | captured |
//! | otherwise             | discarded                      | captured |
//!
//! Captured stderr is included verbatim in [`Error::CommandFailed`]. A
//! non-zero exit status is the only failure signal; nothing is retried.
//!
//! ## Example
//!
//! ```no_run
//! use cmdrun::{CommandExecutor, CommandSpec, Runner, RunSettings};
//!
//! let runner = Runner::new(RunSettings::default());
//! let out = runner
//!     .execute(&CommandSpec::new("uname").arg("-r").capture(true))
//!     .unwrap();
//! println!("kernel {}", out.stdout_trimmed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mock;
pub mod path;
pub mod types;
pub mod wrap;

pub use error::{Error, ErrorCategory, Result};
pub use mock::RecordingExecutor;
pub use path::{PathLayer, SearchPath};
pub use types::{CommandOutput, CommandSpec, Privilege, RunSettings, display_command};

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a child with a deadline is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Anything that can execute a [`CommandSpec`].
///
/// The step engine and provisioner depend on this trait rather than on
/// [`Runner`] so they can be exercised with [`RecordingExecutor`].
pub trait CommandExecutor: Send + Sync {
    /// Execute a command, failing on a non-zero exit status.
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// The real process runner.
#[derive(Debug, Clone)]
pub struct Runner {
    settings: RunSettings,
    search_path: SearchPath,
}

impl Runner {
    /// Create a runner using the enhanced PATH of the current environment.
    #[must_use]
    pub fn new(settings: RunSettings) -> Self {
        Self::with_search_path(settings, SearchPath::from_env())
    }

    /// Create a runner with an explicit search path.
    #[must_use]
    pub fn with_search_path(settings: RunSettings, search_path: SearchPath) -> Self {
        Self {
            settings,
            search_path,
        }
    }

    /// The search path exported to every child.
    #[must_use]
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Run-wide settings.
    #[must_use]
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    fn open_log(&self, path: &Path, command: &str) -> Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{stamp}] $ {command}").map_err(|e| Error::io(path, e))?;
        Ok(file)
    }
}

impl CommandExecutor for Runner {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut privilege = spec.privilege.clone();
        if self.settings.elevate_by_default && privilege == Privilege::Current {
            privilege = Privilege::Elevated;
        }
        let interactive = spec.interactive || self.settings.interactive;
        let timeout = spec.timeout.or(self.settings.default_timeout);
        let path = self.search_path.to_os_string();

        let invocation = wrap::wrap(
            &spec.program,
            &spec.args,
            &privilege,
            &spec.env,
            &path,
            wrap::is_root(),
        )?;
        let command_line = spec.display();
        log::debug!("exec: {invocation}");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).env("PATH", &path).envs(&spec.env);

        if interactive {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null()).stderr(Stdio::piped());
            if spec.capture {
                cmd.stdout(Stdio::piped());
            } else if self.settings.debug {
                cmd.stdout(Stdio::inherit());
            } else if let Some(log_file) = &self.settings.log_file {
                let file = self.open_log(log_file, &command_line)?;
                cmd.stdout(Stdio::from(file));
            } else {
                cmd.stdout(Stdio::null());
            }
        }

        let child = cmd.spawn().map_err(|source| Error::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let (status, stdout, stderr) = wait_child(child, timeout, &command_line)?;

        if !status.success() {
            log::debug!("command failed: {command_line} ({status})");
            return Err(Error::CommandFailed {
                command: command_line,
                code: status.code(),
                stderr,
            });
        }

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    reader.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Wait for a child, draining its pipes, and enforce the deadline if any.
fn wait_child(
    mut child: Child,
    timeout: Option<Duration>,
    command_line: &str,
) -> Result<(ExitStatus, String, String)> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let spawn_err = |source| Error::Spawn {
        program: command_line.to_string(),
        source,
    };

    let status = match timeout {
        None => child.wait().map_err(spawn_err)?,
        Some(limit) => {
            let started = Instant::now();
            loop {
                if let Some(status) = child.try_wait().map_err(spawn_err)? {
                    break status;
                }
                if started.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::TimedOut {
                        command: command_line.to_string(),
                        timeout: limit,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    Ok((status, collect(stdout), collect(stderr)))
}
