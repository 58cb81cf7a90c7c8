//! Append-only store of past reports, one JSON file per analysis run.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::error::PersistenceError;
use crate::models::{HistorySummary, Report, UNKNOWN};

/// Reduce `name` to a safe file name component: accents are folded (NFKD),
/// path separators and whitespace become `_`, anything outside
/// `[A-Za-z0-9._-]` is dropped.
pub fn sanitize_filename(name: &str) -> String {
    let folded: String = name.nfkd().collect();
    let collapsed = folded
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let kept: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

pub fn record_filename(timestamp: i64, company: &str) -> String {
    let company = match sanitize_filename(company) {
        safe if safe.is_empty() => UNKNOWN.to_string(),
        safe => safe,
    };
    format!("{timestamp}_{company}.json")
}

#[derive(Deserialize)]
struct StoredRecord {
    #[serde(default)]
    meta: StoredMeta,
    #[serde(default)]
    stats: StoredStats,
}

#[derive(Deserialize)]
struct StoredMeta {
    #[serde(default = "unknown")]
    date: String,
    #[serde(default = "unknown")]
    company: String,
    #[serde(default = "unknown")]
    group: String,
}

impl Default for StoredMeta {
    fn default() -> Self {
        Self {
            date: unknown(),
            company: unknown(),
            group: unknown(),
        }
    }
}

#[derive(Deserialize, Default)]
struct StoredStats {
    #[serde(default)]
    high: usize,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
        move |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn save(&self, report: &Report) -> Result<String, PersistenceError> {
        self.save_at(report, Utc::now().timestamp())
    }

    /// Write `report` under a name derived from `timestamp` and the company.
    /// Existing records are never overwritten; a numeric suffix is added instead.
    pub fn save_at(&self, report: &Report, timestamp: i64) -> Result<String, PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(Self::io_error(&self.dir))?;

        let base = record_filename(timestamp, &report.meta.company);
        let stem = base.trim_end_matches(".json");
        let mut attempt = 0;

        loop {
            let filename = match attempt {
                0 => base.clone(),
                n => format!("{stem}-{n}.json"),
            };
            let path = self.dir.join(&filename);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    attempt += 1;
                    continue;
                }
                Err(err) => return Err(Self::io_error(&path)(err)),
            };

            let mut stored = report.clone();
            stored.history_filename = Some(filename.clone());
            let json = serde_json::to_string(&stored).map_err(|source| PersistenceError::Format {
                name: filename.clone(),
                source,
            })?;

            file.write_all(json.as_bytes()).map_err(Self::io_error(&path))?;
            info!(file = %filename, "report saved to history");

            return Ok(filename);
        }
    }

    /// Newest first. Unreadable or malformed records are skipped.
    pub fn list(&self) -> Result<Vec<HistorySummary>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(Self::io_error(&self.dir))? {
            let entry = entry.map_err(Self::io_error(&self.dir))?;
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".json") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut summaries = Vec::new();
        for name in names {
            match self.read_summary(&name) {
                Ok(summary) => summaries.push(summary),
                Err(err) => debug!(file = %name, error = %err, "skipping history record"),
            }
        }

        Ok(summaries)
    }

    fn read_summary(&self, name: &str) -> Result<HistorySummary, PersistenceError> {
        let path = self.dir.join(name);
        let content = fs::read_to_string(&path).map_err(Self::io_error(&path))?;
        let record: StoredRecord =
            serde_json::from_str(&content).map_err(|source| PersistenceError::Format {
                name: name.to_string(),
                source,
            })?;

        Ok(HistorySummary {
            filename: name.to_string(),
            date: record.meta.date,
            company: record.meta.company,
            group: record.meta.group,
            high_risk: record.stats.high,
            timestamp: name.split('_').next().unwrap_or_default().to_string(),
        })
    }

    pub fn load(&self, filename: &str) -> Result<Report, PersistenceError> {
        let safe = sanitize_filename(filename);
        let path = self.dir.join(&safe);
        if safe.is_empty() || !path.is_file() {
            return Err(PersistenceError::NotFound(filename.to_string()));
        }

        let content = fs::read_to_string(&path).map_err(Self::io_error(&path))?;
        serde_json::from_str(&content).map_err(|source| PersistenceError::Format { name: safe, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CohortStats, ReportMeta};

    fn report(company: &str, high: usize) -> Report {
        Report {
            success: true,
            meta: ReportMeta {
                company: company.to_string(),
                group: "G-1".to_string(),
                date: "2026-02-01".to_string(),
                total: 0,
            },
            stats: CohortStats {
                high_count: high,
                ..CohortStats::default()
            },
            students: Vec::new(),
            history_filename: None,
        }
    }

    #[test]
    fn sanitize_follows_secure_filename_rules() {
        assert_eq!(sanitize_filename("Acme Corp"), "Acme_Corp");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("  Niño & Co. "), "Nino__Co");
        assert_eq!(sanitize_filename("Educación Señor"), "Educacion_Senor");
        assert_eq!(sanitize_filename("1700000000_Acme.json"), "1700000000_Acme.json");
    }

    #[test]
    fn record_filename_falls_back_to_unknown() {
        assert_eq!(record_filename(1700000000, "Acme Corp"), "1700000000_Acme_Corp.json");
        assert_eq!(record_filename(1700000000, "???"), "1700000000_Unknown.json");
    }

    #[test]
    fn save_then_load_returns_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        let name = store.save_at(&report("Acme", 2), 1700000000).unwrap();
        assert_eq!(name, "1700000000_Acme.json");

        let loaded = store.load(&name).unwrap();
        assert_eq!(loaded.history_filename.as_deref(), Some(name.as_str()));
        assert_eq!(loaded.stats.high_count, 2);
        assert_eq!(loaded.meta, report("Acme", 2).meta);
    }

    #[test]
    fn save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        let first = store.save_at(&report("Acme", 1), 1700000000).unwrap();
        let second = store.save_at(&report("Acme", 3), 1700000000).unwrap();
        assert_ne!(first, second);
        assert_eq!(second, "1700000000_Acme-1.json");
        assert_eq!(store.load(&first).unwrap().stats.high_count, 1);
    }

    #[test]
    fn save_leaves_existing_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        let taken = dir.path().join("1700000000_Acme.json");
        fs::write(&taken, "written by another run").unwrap();

        let name = store.save_at(&report("Acme", 5), 1700000000).unwrap();
        assert_eq!(name, "1700000000_Acme-1.json");
        assert_eq!(fs::read_to_string(&taken).unwrap(), "written by another run");
        assert_eq!(store.load(&name).unwrap().stats.high_count, 5);
    }

    #[test]
    fn record_filename_folds_accents() {
        assert_eq!(record_filename(1700000000, "Compañía Ñandú"), "1700000000_Compania_Nandu.json");
    }

    #[test]
    fn list_is_newest_first_and_skips_broken_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.save_at(&report("Acme", 1), 1700000000).unwrap();
        store.save_at(&report("Globex", 4), 1700000500).unwrap();
        fs::write(dir.path().join("1700000900_Broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let summaries = store.list().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].company, "Globex");
        assert_eq!(summaries[0].high_risk, 4);
        assert_eq!(summaries[0].timestamp, "1700000500");
        assert_eq!(summaries[1].filename, "1700000000_Acme.json");
        assert_eq!(summaries[1].group, "G-1");
    }

    #[test]
    fn list_tolerates_partial_records() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1700000000_Old.json"), r#"{"meta":{}}"#).unwrap();

        let summaries = HistoryStore::new(dir.path()).list().unwrap();
        assert_eq!(summaries[0].company, "Unknown");
        assert_eq!(summaries[0].high_risk, 0);
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn load_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        let err = store.load("1700000000_Nobody.json").unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));

        let err = store.load("../secret.json").unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }
}
