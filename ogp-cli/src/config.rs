use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ogp"),
        }
    }
}

impl CliConfig {
    /// `--database` wins over `DATABASE_PATH`, which wins over the data dir.
    pub fn database_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| {
            std::env::var("DATABASE_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| self.data_dir.join("games.db"))
    }
}
