use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SETTINGS_FILE: &str = "last_paths.json";

/// Where a Popper checkout usually ends up, relative to the home directory.
const DEFAULT_POPPER_PATHS: &[&str] = &[
    "popper/popper.py",
    "popper/popper/popper.py",
    "popper/popper_ilp/popper.py",
];

#[derive(Debug)]
pub struct SettingsError(pub String);

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SettingsError {}

/// The paths used by the most recent run, remembered between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popper_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bk: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exs: Option<PathBuf>,
}

impl Settings {
    pub fn load(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(dir.join(SETTINGS_FILE))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Loads the settings, or starts fresh if there are none.
    pub fn load_or_default(dir: &Path) -> Self {
        Self::load(dir).unwrap_or_default()
    }

    pub fn save(&self, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(self)?;
        std::fs::write(dir.join(SETTINGS_FILE), json)?;
        Ok(())
    }

    /// Overwrites the fields that are set in other, keeping the rest.
    pub fn merge(&mut self, other: Settings) {
        if other.popper_path.is_some() {
            self.popper_path = other.popper_path;
        }
        if other.bk.is_some() {
            self.bk = other.bk;
        }
        if other.bias.is_some() {
            self.bias = other.bias;
        }
        if other.exs.is_some() {
            self.exs = other.exs;
        }
    }

    /// Merges into the stored settings and saves them.
    pub fn update(dir: &Path, other: Settings) -> Result<Settings, Box<dyn std::error::Error>> {
        let mut settings = Self::load_or_default(dir);
        settings.merge(other);
        settings.save(dir)?;
        Ok(settings)
    }
}

/// The user's home directory, from the environment.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Finds popper.py.
/// Tries the remembered path, then the usual checkout locations, then searches
/// the ~/popper directory.
pub fn locate_popper(settings: &Settings, home: Option<&Path>) -> Result<PathBuf, SettingsError> {
    if let Some(path) = &settings.popper_path {
        if path.exists() {
            return Ok(path.clone());
        }
        tracing::debug!("remembered popper path {} is gone", path.display());
    }

    let Some(home) = home else {
        return Err(SettingsError(
            "could not find popper.py: no home directory".to_string(),
        ));
    };

    for relative in DEFAULT_POPPER_PATHS {
        let path = home.join(relative);
        if path.exists() {
            return Ok(path);
        }
    }

    let popper_dir = home.join("popper");
    if popper_dir.is_dir() {
        for entry in WalkDir::new(&popper_dir).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file() && entry.file_name() == "popper.py" {
                return Ok(entry.into_path());
            }
        }
    }

    Err(SettingsError(format!(
        "could not find popper.py. Clone https://github.com/logic-and-learning-lab/popper into {} or pass --popper.",
        popper_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn test_settings_merge_and_reload() {
        let temp = TempDir::new().unwrap();
        Settings::update(
            temp.path(),
            Settings {
                bk: Some(PathBuf::from("bk.pl")),
                bias: Some(PathBuf::from("bias.pl")),
                ..Default::default()
            },
        )
        .unwrap();
        let merged = Settings::update(
            temp.path(),
            Settings {
                bk: Some(PathBuf::from("other_bk.pl")),
                exs: Some(PathBuf::from("exs.pl")),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(merged.bk, Some(PathBuf::from("other_bk.pl")));
        assert_eq!(merged.bias, Some(PathBuf::from("bias.pl")));
        assert_eq!(merged.exs, Some(PathBuf::from("exs.pl")));
        assert_eq!(Settings::load(temp.path()).unwrap(), merged);
    }

    #[test]
    fn test_missing_settings_are_default() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Settings::load_or_default(temp.path()), Settings::default());
    }

    #[test]
    fn test_locate_remembered_popper() {
        let temp = TempDir::new().unwrap();
        let script = temp.child("elsewhere/popper.py");
        script.write_str("").unwrap();
        let settings = Settings {
            popper_path: Some(script.path().to_path_buf()),
            ..Default::default()
        };
        let found = locate_popper(&settings, Some(temp.path())).unwrap();
        assert_eq!(found, script.path());
    }

    #[test]
    fn test_locate_default_checkout() {
        let temp = TempDir::new().unwrap();
        let script = temp.child("popper/popper_ilp/popper.py");
        script.write_str("").unwrap();
        let settings = Settings {
            popper_path: Some(PathBuf::from("/nonexistent/popper.py")),
            ..Default::default()
        };
        let found = locate_popper(&settings, Some(temp.path())).unwrap();
        assert_eq!(found, script.path());
    }

    #[test]
    fn test_locate_by_walking() {
        let temp = TempDir::new().unwrap();
        let script = temp.child("popper/src/deep/popper.py");
        script.write_str("").unwrap();
        let found = locate_popper(&Settings::default(), Some(temp.path())).unwrap();
        assert_eq!(found, script.path());
    }

    #[test]
    fn test_locate_fails_without_checkout() {
        let temp = TempDir::new().unwrap();
        assert!(locate_popper(&Settings::default(), Some(temp.path())).is_err());
        assert!(locate_popper(&Settings::default(), None).is_err());
    }
}
