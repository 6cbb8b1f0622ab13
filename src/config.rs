use std::path::PathBuf;

use anyhow::{bail, Context};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://gpa-tracker.db";
pub const DEFAULT_ROSTER_PATH: &str = "roster.json";
pub const DEFAULT_REPORT_DIR: &str = "reports";
pub const DEFAULT_ROWS_PER_PAGE: usize = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub roster_path: PathBuf,
    pub report_dir: PathBuf,
    pub rows_per_page: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            roster_path: PathBuf::from(DEFAULT_ROSTER_PATH),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = AppConfig::default();
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(path) = lookup("GPA_ROSTER_PATH") {
            config.roster_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("GPA_REPORT_DIR") {
            config.report_dir = PathBuf::from(dir);
        }
        if let Some(rows) = lookup("GPA_REPORT_ROWS_PER_PAGE") {
            let rows: usize = rows
                .trim()
                .parse()
                .with_context(|| format!("GPA_REPORT_ROWS_PER_PAGE must be an integer, got {rows:?}"))?;
            if rows == 0 {
                bail!("GPA_REPORT_ROWS_PER_PAGE must be positive");
            }
            config.rows_per_page = rows;
        }
        Ok(config)
    }
}
