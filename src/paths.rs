//! Platform-specific filesystem path helpers.

use std::ffi::OsString;
use std::path::PathBuf;

/// Path to the debug log file.
///
/// This is located in the OS temp directory.
#[must_use]
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join(log_file_name())
}

/// File name of the debug log, relative to [`std::env::temp_dir`].
#[must_use]
pub const fn log_file_name() -> &'static str {
    "model-acl.log"
}

#[must_use]
#[cfg(not(windows))]
fn home_dir_from(var_os: &mut impl FnMut(&'static str) -> Option<OsString>) -> Option<PathBuf> {
    var_os("HOME").map(PathBuf::from)
}

#[must_use]
#[cfg(windows)]
fn config_dir_from(var_os: &mut impl FnMut(&'static str) -> Option<OsString>) -> Option<PathBuf> {
    var_os("APPDATA").map(PathBuf::from)
}

#[must_use]
#[cfg(not(windows))]
fn config_dir_from(var_os: &mut impl FnMut(&'static str) -> Option<OsString>) -> Option<PathBuf> {
    var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            home_dir_from(var_os).map(|home| {
                #[cfg(target_os = "macos")]
                {
                    home.join("Library").join("Application Support")
                }

                #[cfg(not(target_os = "macos"))]
                {
                    home.join(".config")
                }
            })
        })
}

/// Resolve the per-user configuration directory for the current platform.
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    let mut var_os = |key: &'static str| std::env::var_os(key);
    config_dir_from(&mut var_os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_suffix() {
        let path = log_path();
        assert!(path.ends_with("model-acl.log"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_config_dir_from_prefers_xdg_config_home() {
        let mut env = |key: &'static str| {
            (key == "XDG_CONFIG_HOME").then(|| OsString::from("/tmp/model-acl-xdg"))
        };

        assert_eq!(
            config_dir_from(&mut env),
            Some(PathBuf::from("/tmp/model-acl-xdg"))
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_config_dir_from_ignores_empty_xdg_config_home() {
        let mut env = |key: &'static str| match key {
            "XDG_CONFIG_HOME" => Some(OsString::new()),
            "HOME" => Some(OsString::from("/tmp/model-acl-home")),
            _ => None,
        };

        let resolved = config_dir_from(&mut env);
        assert!(resolved.is_some_and(|dir| dir.starts_with("/tmp/model-acl-home")));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_config_dir_from_falls_back_to_home() {
        let mut env =
            |key: &'static str| (key == "HOME").then(|| OsString::from("/tmp/model-acl-home"));

        #[cfg(target_os = "macos")]
        let expected = PathBuf::from("/tmp/model-acl-home")
            .join("Library")
            .join("Application Support");

        #[cfg(not(target_os = "macos"))]
        let expected = PathBuf::from("/tmp/model-acl-home").join(".config");

        assert_eq!(config_dir_from(&mut env), Some(expected));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_config_dir_from_none_when_no_env() {
        let mut env = |_: &'static str| None::<OsString>;
        assert_eq!(config_dir_from(&mut env), None);
    }
}
