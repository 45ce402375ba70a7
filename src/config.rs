//! Configuration loading and management

use std::path::PathBuf;

use anyhow::Result;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// JSON file with the ordered question list
    pub questions_path: PathBuf,

    /// JSON file holding the persisted answers
    pub store_path: PathBuf,

    /// Destination for the exported answer document
    pub export_path: PathBuf,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os("VOICEFORM_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("voiceform")
            }
        };

        let questions_path = match std::env::var_os("VOICEFORM_QUESTIONS") {
            Some(path) => PathBuf::from(path),
            None => data_dir.join("questions.json"),
        };

        let store_path = data_dir.join("answers.json");
        let export_path = data_dir.join("answers-export.txt");

        Ok(Self {
            data_dir,
            questions_path,
            store_path,
            export_path,
        })
    }

    /// Ensure the data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
