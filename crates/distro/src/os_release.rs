//! os-release parsing.
//!
//! See `os-release(5)`. Only the handful of keys the resolver and system
//! identity need are kept.

use std::fs;
use std::path::Path;

/// Locations checked, in order.
pub const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// Parsed os-release metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    /// `ID`, lowercased.
    pub id: String,
    /// `ID_LIKE`, split on whitespace.
    pub id_like: Vec<String>,
    /// `VERSION_ID`.
    pub version_id: Option<String>,
    /// `VERSION_CODENAME`, e.g. `jammy`.
    pub version_codename: Option<String>,
    /// `NAME`.
    pub name: Option<String>,
    /// `PRETTY_NAME`.
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Read the host's os-release file. Returns `None` if none is readable.
    pub fn load() -> Option<Self> {
        OS_RELEASE_PATHS
            .iter()
            .find_map(|p| Self::from_path(Path::new(p)))
    }

    /// Read and parse a specific file.
    pub fn from_path(path: &Path) -> Option<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Some(Self::parse(&content)),
            Err(e) => {
                log::trace!("cannot read {}: {e}", path.display());
                None
            }
        }
    }

    /// Parse os-release content.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut release = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, raw)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(raw.trim());

            match key.trim() {
                "ID" => release.id = value.to_lowercase(),
                "ID_LIKE" => {
                    release.id_like = value
                        .split_whitespace()
                        .map(str::to_lowercase)
                        .collect();
                }
                "VERSION_ID" => release.version_id = Some(value),
                "VERSION_CODENAME" if !value.is_empty() => release.version_codename = Some(value),
                "NAME" => release.name = Some(value),
                "PRETTY_NAME" => release.pretty_name = Some(value),
                _ => {}
            }
        }

        release
    }
}

fn unquote(value: &str) -> String {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    stripped.replace("\\\"", "\"").replace("\\$", "$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const POP_OS: &str = r#"
NAME="Pop!_OS"
VERSION="22.04 LTS"
ID=pop
ID_LIKE="ubuntu debian"
PRETTY_NAME="Pop!_OS 22.04 LTS"
VERSION_ID="22.04"
VERSION_CODENAME=jammy
"#;

    #[test]
    fn test_parse_quoted_values() {
        let release = OsRelease::parse(POP_OS);
        assert_eq!(release.id, "pop");
        assert_eq!(release.id_like, vec!["ubuntu", "debian"]);
        assert_eq!(release.version_id.as_deref(), Some("22.04"));
        assert_eq!(release.version_codename.as_deref(), Some("jammy"));
        assert_eq!(release.name.as_deref(), Some("Pop!_OS"));
        assert_eq!(release.pretty_name.as_deref(), Some("Pop!_OS 22.04 LTS"));
    }

    #[test]
    fn test_parse_unquoted_and_single_quoted() {
        let release = OsRelease::parse("ID=arch\nID_LIKE='archlinux'\n");
        assert_eq!(release.id, "arch");
        assert_eq!(release.id_like, vec!["archlinux"]);
        assert!(release.version_id.is_none());
    }

    #[test]
    fn test_parse_skips_comments_and_garbage() {
        let release = OsRelease::parse("# comment\nnot a pair\nID=Fedora\n");
        assert_eq!(release.id, "fedora");
        assert!(release.id_like.is_empty());
    }

    #[test]
    fn test_parse_escaped_quotes() {
        let release = OsRelease::parse(r#"NAME="Say \"hi\"""#);
        assert_eq!(release.name.as_deref(), Some(r#"Say "hi""#));
    }

    #[test]
    fn test_from_path() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "ID=alpine\nVERSION_ID=3.19.1\n").unwrap();

        let release = OsRelease::from_path(file.path()).unwrap();
        assert_eq!(release.id, "alpine");
        assert_eq!(release.version_id.as_deref(), Some("3.19.1"));
    }

    #[test]
    fn test_from_missing_path() {
        assert!(OsRelease::from_path(Path::new("/nonexistent/os-release")).is_none());
    }
}
