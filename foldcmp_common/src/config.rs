use crate::{AppConfig, FoldCmpError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "foldcmp.toml";

/// A configuration as read from disk, with where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    /// False when `config` holds defaults because nothing was on disk yet
    pub exists: bool,
    pub portable: bool,
}

/// Where the configuration file lives.
///
/// A file next to the executable wins when it already exists or when
/// portable mode is asked for; otherwise the per-user config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfigLocation {
    file: PathBuf,
    portable: bool,
}

impl ConfigLocation {
    fn discover(prefer_portable: bool) -> Result<Self, FoldCmpError> {
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)));

        match beside_exe {
            Some(file) if prefer_portable || file.is_file() => Ok(Self {
                file,
                portable: true,
            }),
            _ => Self::per_user(),
        }
    }

    fn per_user() -> Result<Self, FoldCmpError> {
        let dirs = ProjectDirs::from("", "foldcmp", "foldcmp").ok_or_else(|| {
            FoldCmpError::Config("No per-user config directory on this platform".to_string())
        })?;
        Ok(Self {
            file: dirs.config_dir().join(CONFIG_FILE_NAME),
            portable: false,
        })
    }

    fn read(self) -> Result<LoadedConfig, FoldCmpError> {
        let stored = match fs::read_to_string(&self.file) {
            Ok(text) => Some(parse_config(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let exists = stored.is_some();
        let mut config = stored.unwrap_or_default();
        config.portable_mode = self.portable;

        Ok(LoadedConfig {
            config,
            path: self.file,
            exists,
            portable: self.portable,
        })
    }
}

fn parse_config(text: &str) -> Result<AppConfig, FoldCmpError> {
    let config: AppConfig =
        toml::from_str(text).map_err(|e| FoldCmpError::Serialization(e.to_string()))?;

    if config.worker_multiplier == 0 {
        return Err(FoldCmpError::Config(
            "worker_multiplier must be at least 1".to_string(),
        ));
    }
    Ok(config)
}

/// Read the active configuration, falling back to defaults when no file exists
pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, FoldCmpError> {
    ConfigLocation::discover(prefer_portable)?.read()
}

/// Same as [`load_config`] for a known file
pub fn load_config_from(path: &Path, portable: bool) -> Result<LoadedConfig, FoldCmpError> {
    ConfigLocation {
        file: path.to_path_buf(),
        portable,
    }
    .read()
}

/// Like [`load_config`], but writes the defaults out when no file exists yet
pub fn ensure_config(prefer_portable: bool) -> Result<LoadedConfig, FoldCmpError> {
    let loaded = load_config(prefer_portable)?;
    if !loaded.exists {
        save_config(&loaded.path, &loaded.config)?;
    }
    Ok(loaded)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), FoldCmpError> {
    let text = toml::to_string_pretty(config)
        .map_err(|e| FoldCmpError::Serialization(e.to_string()))?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnreadablePolicy;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = load_config_from(&temp.path().join(CONFIG_FILE_NAME), false).unwrap();

        assert!(!loaded.exists);
        assert!(!loaded.config.portable_mode);
        assert!(loaded.config.verify_content);
        assert!(loaded.config.ignore_patterns.is_empty());
    }

    #[test]
    fn test_save_then_load_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.ignore_patterns = vec!["*.tmp".to_string()];
        config.unreadable_policy = UnreadablePolicy::TreatAsMismatch;
        config.workers = Some(4);
        save_config(&path, &config).unwrap();

        let loaded = load_config_from(&path, true).unwrap();
        assert!(loaded.exists);
        assert!(loaded.portable);
        assert!(loaded.config.portable_mode);
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.ignore_patterns, vec!["*.tmp".to_string()]);
        assert_eq!(loaded.config.unreadable_policy, UnreadablePolicy::TreatAsMismatch);
        assert_eq!(loaded.config.workers, Some(4));
    }

    #[test]
    fn test_invalid_config_is_serialization_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "verify_content = \"maybe\"").unwrap();

        let err = load_config_from(&path, false).unwrap_err();
        assert!(matches!(err, FoldCmpError::Serialization(_)));
    }

    #[test]
    fn test_zero_worker_multiplier_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "worker_multiplier = 0\n").unwrap();

        let err = load_config_from(&path, false).unwrap_err();
        assert!(matches!(err, FoldCmpError::Config(_)));
    }

    #[test]
    fn test_config_path_is_a_directory() {
        let temp = TempDir::new().unwrap();
        let err = load_config_from(temp.path(), false).unwrap_err();
        assert!(matches!(err, FoldCmpError::Io(_)));
    }
}
