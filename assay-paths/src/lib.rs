//! Where assay keeps its files.
//!
//! ```text
//! $XDG_CONFIG_HOME/assay/config.toml   user configuration
//! $XDG_DATA_HOME/assay/db/             CozoDB catalog, attempts and contexts
//! ```
//!
//! Without the XDG variables the home-relative defaults `~/.config` and
//! `~/.local/share` apply. Project configuration (`.assay/config.toml`) is
//! resolved by the CLI, not here.

use std::path::PathBuf;

const APP: &str = "assay";

/// `$<var>/assay`, falling back to `<home>/<home_relative>/assay`
fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    let base = match std::env::var_os(var) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .map(|home| home.join(home_relative))
            .unwrap_or_else(|| PathBuf::from(home_relative)),
    };
    base.join(APP)
}

/// Directory holding the user config file
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// The user config file, `config_dir()/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Directory for persistent engine state
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default database location used when the config leaves `db_path` unset
pub fn database_dir() -> PathBuf {
    data_dir().join("db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_lives_under_data_dir() {
        let db = database_dir();
        assert!(db.ends_with("assay/db"));
        assert!(db.starts_with(data_dir()));
    }

    #[test]
    fn test_config_file_lives_under_config_dir() {
        assert_eq!(config_file().parent(), Some(config_dir().as_path()));
    }

    #[test]
    fn test_xdg_variable_wins_over_home() {
        unsafe {
            std::env::set_var("ASSAY_TEST_XDG_SET", "/tmp/xdg-root");
        }
        assert_eq!(
            xdg_dir("ASSAY_TEST_XDG_SET", ".config"),
            PathBuf::from("/tmp/xdg-root/assay")
        );
        unsafe {
            std::env::remove_var("ASSAY_TEST_XDG_SET");
        }
    }

    #[test]
    fn test_empty_xdg_variable_is_ignored() {
        unsafe {
            std::env::set_var("ASSAY_TEST_XDG_EMPTY", "");
        }
        let dir = xdg_dir("ASSAY_TEST_XDG_EMPTY", ".local/share");
        assert!(dir.ends_with(".local/share/assay"));
        unsafe {
            std::env::remove_var("ASSAY_TEST_XDG_EMPTY");
        }
    }
}
