use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const HISTORY_FILE: &str = "history.json";

/// One rendered hypothesis, as it was shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Local time, formatted as "%Y-%m-%d %H:%M:%S".
    pub timestamp: String,

    /// The markup lines of the hypothesis.
    pub hypotheses: Vec<String>,
}

impl HistoryEntry {
    pub fn now(hypotheses: Vec<String>) -> Self {
        HistoryEntry {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            hypotheses,
        }
    }
}

/// The history of every hypothesis rendered, across sessions.
/// Stored as a JSON array in a single file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// A store that will save to the given file, starting empty.
    pub fn new(path: PathBuf) -> Self {
        HistoryStore {
            path,
            entries: vec![],
        }
    }

    fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let entries = serde_json::from_str(&contents)?;
        Ok(entries)
    }

    /// Loads the history file.
    /// A missing or unreadable file gives an empty history, rather than an error.
    pub fn load(path: PathBuf) -> Self {
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("ignoring unreadable history at {}: {}", path.display(), e);
                }
                vec![]
            }
        };
        HistoryStore { path, entries }
    }

    /// Loads history.json from a data directory.
    pub fn load_from_dir(dir: &Path) -> Self {
        Self::load(dir.join(HISTORY_FILE))
    }

    /// Writes to a temporary file first, then renames it, so a crash can't leave
    /// a half-written history behind.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    pub fn push(&mut self, hypotheses: Vec<String>) -> &HistoryEntry {
        self.entries.push(HistoryEntry::now(hypotheses));
        &self.entries[self.entries.len() - 1]
    }

    /// Forgets everything, on disk too.
    pub fn clear(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.entries.clear();
        self.save()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A human-readable listing, numbered from 1.
    pub fn render_listing(&self) -> String {
        let mut answer = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            answer.push_str(&format!("#{} - {}\n", i + 1, entry.timestamp));
            answer.push_str(&entry.hypotheses.join("\n"));
            answer.push_str("\n\n");
        }
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_history_save_load() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let mut history = HistoryStore::load_from_dir(temp_dir.path());
        assert!(history.is_empty());

        history.push(vec!["∀ X (f(X) ⇐ g(X))".to_string()]);
        history.push(vec!["a()".to_string(), "b()".to_string()]);
        history.save().expect("Failed to save history");

        let loaded = HistoryStore::load_from_dir(temp_dir.path());
        assert_eq!(loaded.entries(), history.entries());
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.entries()[1].hypotheses, vec!["a()", "b()"]);

        // The file is an array of entries with these two fields.
        let raw = std::fs::read_to_string(temp_dir.path().join(HISTORY_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value[0]["timestamp"].is_string());
        assert!(value[0]["hypotheses"].is_array());
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(HISTORY_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        let history = HistoryStore::load(path);
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear_persists() {
        let temp_dir = tempdir().unwrap();
        let mut history = HistoryStore::load_from_dir(temp_dir.path());
        history.push(vec!["a()".to_string()]);
        history.save().unwrap();
        history.clear().unwrap();
        assert!(HistoryStore::load_from_dir(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_listing() {
        let mut history = HistoryStore::new(PathBuf::from("unused.json"));
        history.push(vec!["a()".to_string(), "b()".to_string()]);
        let timestamp = history.entries()[0].timestamp.clone();
        assert_eq!(timestamp.len(), "2024-01-01 00:00:00".len());
        assert_eq!(
            history.render_listing(),
            format!("#1 - {}\na()\nb()\n\n", timestamp)
        );
    }
}
