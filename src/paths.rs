//! Where outfit keeps its files.
//!
//! Two directories matter: the config directory (settings and custom
//! provider definitions) and the state directory (the command log).
//! Each resolves in order:
//!
//! 1. `OUTFIT_CONFIG_DIR` / `OUTFIT_STATE_DIR` (tilde and `$VAR` expanded)
//! 2. `$XDG_CONFIG_HOME/outfit` / `$XDG_STATE_HOME/outfit`
//! 3. On Windows, the platform config / local data directory
//! 4. `~/.config/outfit` / `~/.local/state/outfit`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "OUTFIT_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "OUTFIT_STATE_DIR";

const APP_DIR: &str = "outfit";

/// Command log file name inside the state directory
pub const LOG_FILE: &str = "outfit.log";

#[derive(Debug, Clone, Copy)]
enum Dir {
    Config,
    State,
}

impl Dir {
    const fn override_var(self) -> &'static str {
        match self {
            Self::Config => ENV_CONFIG_DIR,
            Self::State => ENV_STATE_DIR,
        }
    }

    const fn xdg_var(self) -> &'static str {
        match self {
            Self::Config => "XDG_CONFIG_HOME",
            Self::State => "XDG_STATE_HOME",
        }
    }

    fn platform_base(self) -> Option<PathBuf> {
        if !cfg!(windows) {
            return None;
        }
        match self {
            Self::Config => dirs::config_dir(),
            Self::State => dirs::data_local_dir(),
        }
    }

    fn home_relative(self, home: &Path) -> PathBuf {
        match self {
            Self::Config => home.join(".config"),
            Self::State => home.join(".local").join("state"),
        }
    }

    fn resolve(self) -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(self.override_var()) {
            let path = expand(&dir);
            log::debug!("{} set: {}", self.override_var(), path.display());
            return Ok(path);
        }

        let base = match std::env::var_os(self.xdg_var()) {
            Some(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
            _ => match self.platform_base() {
                Some(base) => base,
                None => {
                    let home = dirs::home_dir().context("Could not determine home directory")?;
                    self.home_relative(&home)
                }
            },
        };
        let path = base.join(APP_DIR);
        log::debug!("{self:?} dir: {}", path.display());
        Ok(path)
    }
}

/// Settings and custom provider definitions live here.
pub fn config_dir() -> Result<PathBuf> {
    Dir::Config.resolve()
}

/// Runtime state, currently only the command log.
pub fn state_dir() -> Result<PathBuf> {
    Dir::State.resolve()
}

/// `<state dir>/outfit.log`
pub fn default_log_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(LOG_FILE))
}

/// Expand `~` and environment variables. Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, PoisonError};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Run `f` with each `(key, value)` applied; `None` unsets the key.
    /// Previous values are restored afterwards.
    pub(crate) fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, _)| ((*key).to_string(), env::var(key).ok()))
            .collect();

        // SAFETY: ENV_LOCK serializes env access between tests
        unsafe {
            for (key, value) in vars {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
        let result = f();
        // SAFETY: as above
        unsafe {
            for (key, value) in saved {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
        result
    }

    const CLEAR: [(&str, Option<&str>); 4] = [
        (ENV_CONFIG_DIR, None),
        (ENV_STATE_DIR, None),
        ("XDG_CONFIG_HOME", None),
        ("XDG_STATE_HOME", None),
    ];

    #[test]
    fn override_wins_over_xdg() {
        with_env(
            &[
                (ENV_CONFIG_DIR, Some("/srv/outfit")),
                ("XDG_CONFIG_HOME", Some("/tmp/xdg")),
            ],
            || assert_eq!(config_dir().unwrap(), PathBuf::from("/srv/outfit")),
        );
    }

    #[test]
    fn override_is_expanded() {
        let home = dirs::home_dir().unwrap();
        with_env(&[(ENV_CONFIG_DIR, Some("~/dotfiles/outfit"))], || {
            assert_eq!(config_dir().unwrap(), home.join("dotfiles/outfit"));
        });
    }

    #[test]
    fn log_file_follows_state_dir() {
        with_env(&[(ENV_STATE_DIR, Some("/var/tmp/outfit-state"))], || {
            assert_eq!(
                default_log_file().unwrap(),
                PathBuf::from("/var/tmp/outfit-state/outfit.log")
            );
        });
    }

    #[cfg(unix)]
    #[test]
    fn xdg_homes() {
        let mut vars = CLEAR.to_vec();
        vars.push(("XDG_CONFIG_HOME", Some("/tmp/xdg-config")));
        vars.push(("XDG_STATE_HOME", Some("/tmp/xdg-state")));
        with_env(&vars, || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/tmp/xdg-config/outfit"));
            assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg-state/outfit"));
        });
    }

    #[cfg(unix)]
    #[test]
    fn empty_xdg_falls_back_to_home() {
        let home = dirs::home_dir().unwrap();
        let mut vars = CLEAR.to_vec();
        vars.push(("XDG_STATE_HOME", Some("")));
        with_env(&vars, || {
            assert_eq!(config_dir().unwrap(), home.join(".config/outfit"));
            assert_eq!(state_dir().unwrap(), home.join(".local/state/outfit"));
        });
    }

    #[test]
    fn expand_variables() {
        with_env(&[("OUTFIT_TEST_ROOT", Some("/opt/root"))], || {
            assert_eq!(
                expand("$OUTFIT_TEST_ROOT/providers"),
                PathBuf::from("/opt/root/providers")
            );
        });
        assert_eq!(
            expand("/etc/$OUTFIT_SURELY_UNSET_42/x"),
            PathBuf::from("/etc/$OUTFIT_SURELY_UNSET_42/x")
        );
    }
}
