use anyhow::{Context, Result};
use assay_engine::AssayConfig;
use std::path::{Path, PathBuf};
use toml::Table;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (defaults + user + project + explicit file)
    pub fn load(explicit: Option<&Path>) -> Result<AssayConfig> {
        let mut merged = Self::defaults()?;

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            Self::merge_tables(&mut merged, Self::read_table(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            Self::merge_tables(&mut merged, Self::read_table(&project_path)?);
        }

        // Layer 3: --config
        if let Some(path) = explicit {
            Self::merge_tables(&mut merged, Self::read_table(path)?);
        }

        Ok(merged.try_into()?)
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        assay_paths::config_file()
    }

    /// Get project config path
    /// Can be overridden with ASSAY_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("ASSAY_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".assay/config.toml")
        }
    }

    /// Engine defaults with the database under the XDG data dir
    fn defaults() -> Result<Table> {
        Ok(Table::try_from(AssayConfig::default())?)
    }

    fn read_table(path: &Path) -> Result<Table> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        contents
            .parse::<Table>()
            .with_context(|| format!("parsing {}", path.display()))
    }

    /// Merge `overlay` into `base`; nested tables merge key by key, anything
    /// else in the overlay replaces the base value
    fn merge_tables(base: &mut Table, overlay: Table) {
        for (key, value) in overlay {
            match (base.get_mut(&key), value) {
                (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                    Self::merge_tables(existing, incoming);
                }
                (_, value) => {
                    base.insert(key, value);
                }
            }
        }
    }

    /// Load config from a specific path on top of the defaults (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<AssayConfig> {
        let mut merged = Self::defaults()?;
        if path.exists() {
            Self::merge_tables(&mut merged, Self::read_table(path)?);
        }
        Ok(merged.try_into()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.db_path, assay_paths::database_dir());
        assert_eq!(config.generator.passing_percent, 40);
        assert!((config.context.retain_weight - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
db_path = "/tmp/assay-db"

[generator]
overfetch_factor = 3

[thresholds.context]
weak_below = 55
strong_from = 85

[collaborator]
enabled = false
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/assay-db"));
        assert_eq!(config.generator.overfetch_factor, 3);
        assert_eq!(config.generator.passing_percent, 40);
        assert_eq!(config.thresholds.context.weak_below, 55);
        assert_eq!(config.thresholds.topic_status.strong_from, 70);
        assert!(!config.collaborator.enabled);
        assert_eq!(config.collaborator.timeout_ms, 5_000);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        assert!(ConfigLoader::load_from_path(&path).is_err());
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[generator]\noverfetch_factor = \"lots\"\n").unwrap();

        assert!(ConfigLoader::load_from_path(&path).is_err());
    }

    #[test]
    fn test_merge_tables_overlay_wins_per_key() {
        let mut base: Table = "[a]\nx = 1\ny = 2\n[b]\nz = 3\n".parse().unwrap();
        let overlay: Table = "[a]\ny = 20\n".parse().unwrap();

        ConfigLoader::merge_tables(&mut base, overlay);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(20));
        assert_eq!(base["b"]["z"].as_integer(), Some(3));
    }

    #[test]
    #[serial]
    fn test_project_config_is_layered() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "[statistics]\ntrend_window = 5\n",
        )
        .unwrap();

        // SAFETY: env-mutating tests are serialized
        unsafe {
            std::env::set_var("ASSAY_PROJECT_CONFIG_DIR", temp_dir.path());
        }
        let config = ConfigLoader::load(None);
        unsafe {
            std::env::remove_var("ASSAY_PROJECT_CONFIG_DIR");
        }

        let config = config.unwrap();
        assert_eq!(config.statistics.trend_window, 5);
    }

    #[test]
    #[serial]
    fn test_explicit_config_overrides_project() {
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("config.toml"),
            "[statistics]\ntrend_window = 5\n",
        )
        .unwrap();
        let explicit = project.path().join("explicit.toml");
        std::fs::write(&explicit, "[statistics]\ntrend_window = 8\n").unwrap();

        // SAFETY: env-mutating tests are serialized
        unsafe {
            std::env::set_var("ASSAY_PROJECT_CONFIG_DIR", project.path());
        }
        let config = ConfigLoader::load(Some(&explicit));
        unsafe {
            std::env::remove_var("ASSAY_PROJECT_CONFIG_DIR");
        }

        assert_eq!(config.unwrap().statistics.trend_window, 8);
    }

    #[test]
    #[serial]
    fn test_project_config_path_default() {
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".assay/config.toml"));
    }

    #[test]
    fn test_user_config_path_is_under_assay() {
        let path = ConfigLoader::user_config_path();
        assert!(path.to_string_lossy().contains("assay"));
        assert!(path.ends_with("config.toml"));
    }
}
