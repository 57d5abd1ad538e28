mod cache;

pub use cache::ReadCache;

use crate::clock::Clock;
use crate::codec;
use crate::errors::{AppError, AppResult};
use crate::models::{DailyLog, Goals, HabitsDocument, TrackerSettings, UserProfile, WeeklyReview};
use crate::validation::{date_key, ensure_week_label, is_week_label, parse_date_key};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

const LOGS_DIR: &str = "logs";
const REVIEWS_DIR: &str = "reviews";
const REVIEW_PREFIX: &str = "week-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Profile,
    DailyLog,
    Habits,
    WeeklyReview,
    Goals,
    Settings,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        Self::Profile,
        Self::DailyLog,
        Self::Habits,
        Self::WeeklyReview,
        Self::Goals,
        Self::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::DailyLog => "daily_log",
            Self::Habits => "habits",
            Self::WeeklyReview => "weekly_review",
            Self::Goals => "goals",
            Self::Settings => "settings",
        }
    }

    /// The only valid id for single-document kinds (also the file stem).
    pub fn singleton_id(self) -> Option<&'static str> {
        match self {
            Self::Profile => Some("user_profile"),
            Self::Habits => Some("habits"),
            Self::Goals => Some("goals"),
            Self::Settings => Some("settings"),
            Self::DailyLog | Self::WeeklyReview => None,
        }
    }
}

/// A document the store knows how to place and stamp.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: RecordKind;

    /// Writes store-owned fields (timestamps, the key echoed into the body)
    /// right before the record is encoded.
    fn stamp(&mut self, _id: &str, _now: NaiveDateTime) {}
}

impl Record for UserProfile {
    const KIND: RecordKind = RecordKind::Profile;

    fn stamp(&mut self, _id: &str, now: NaiveDateTime) {
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
    }
}

impl Record for DailyLog {
    const KIND: RecordKind = RecordKind::DailyLog;

    fn stamp(&mut self, id: &str, now: NaiveDateTime) {
        if let Ok(date) = parse_date_key(id) {
            self.date = date;
        }
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
    }
}

impl Record for HabitsDocument {
    const KIND: RecordKind = RecordKind::Habits;

    fn stamp(&mut self, _id: &str, now: NaiveDateTime) {
        self.updated_at = Some(now);
    }
}

impl Record for WeeklyReview {
    const KIND: RecordKind = RecordKind::WeeklyReview;

    fn stamp(&mut self, id: &str, now: NaiveDateTime) {
        self.week = id.to_string();
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
    }
}

impl Record for Goals {
    const KIND: RecordKind = RecordKind::Goals;

    fn stamp(&mut self, _id: &str, now: NaiveDateTime) {
        self.updated_at = Some(now);
    }
}

impl Record for TrackerSettings {
    const KIND: RecordKind = RecordKind::Settings;
}

/// File-backed JSON documents under one data root, one file per `(kind, id)`.
pub struct RecordStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    cache: Option<ReadCache>,
}

impl RecordStore {
    pub fn open(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let root = root.into();
        ensure_topology(&root)?;
        Ok(Self {
            root,
            clock,
            cache: None,
        })
    }

    pub fn with_read_cache(mut self, capacity: usize) -> Self {
        self.cache = Some(ReadCache::new(capacity));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn path_for(&self, kind: RecordKind, id: &str) -> AppResult<PathBuf> {
        match kind {
            RecordKind::DailyLog => {
                let date = parse_date_key(id)?;
                let file_name = format!("{}.json", date_key(date));
                Ok(self.root.join(LOGS_DIR).join(file_name))
            }
            RecordKind::WeeklyReview => {
                ensure_week_label(id)?;
                let file_name = format!("{}{}.json", REVIEW_PREFIX, id);
                Ok(self.root.join(REVIEWS_DIR).join(file_name))
            }
            singleton => {
                let expected = singleton.singleton_id().unwrap_or_default();
                if id != expected {
                    return Err(AppError::Validation(format!(
                        "{} is a single document; id must be '{}', got '{}'",
                        singleton.as_str(),
                        expected,
                        id
                    )));
                }
                Ok(self.root.join(format!("{}.json", expected)))
            }
        }
    }

    /// Reads `R` stored under `id`. `Ok(None)` when nothing is stored there;
    /// `Err(AppError::Decode)` when the file exists but cannot be decoded.
    pub fn get<R: Record>(&self, id: &str) -> AppResult<Option<R>> {
        let path = self.path_for(R::KIND, id)?;
        let bytes = match self.read_bytes(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(AppError::Io(format!("{}: {}", path.display(), error))),
        };
        codec::decode(&bytes).map(Some).map_err(AppError::from)
    }

    /// Read-path policy: an unreadable document is logged and treated as absent.
    pub fn get_or_absent<R: Record>(&self, id: &str) -> Option<R> {
        match self.get::<R>(id) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(
                    kind = R::KIND.as_str(),
                    id,
                    error = %error,
                    "treating unreadable record as absent"
                );
                None
            }
        }
    }

    /// Like [`RecordStore::get`], for callers about to overwrite the document.
    /// An undecodable file is moved aside first so the overwrite cannot destroy it.
    pub fn get_for_update<R: Record>(&self, id: &str) -> AppResult<Option<R>> {
        match self.get::<R>(id) {
            Err(AppError::Decode(error)) => {
                let moved = self.quarantine(R::KIND, id)?;
                tracing::warn!(
                    kind = R::KIND.as_str(),
                    id,
                    error = %error,
                    moved_to = ?moved,
                    "quarantined undecodable record before rewrite"
                );
                Ok(None)
            }
            other => other,
        }
    }

    /// Stamps and atomically replaces the document. On failure the previous
    /// file is left as it was; the stamped fields stay on `record`.
    pub fn put<R: Record>(&self, id: &str, record: &mut R) -> AppResult<()> {
        let path = self.path_for(R::KIND, id)?;
        record.stamp(id, self.clock.now());
        let bytes = codec::encode(record)?;

        let result = write_atomic(&path, &bytes);
        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(&path);
        }
        result.map_err(|error| AppError::Write(format!("{}: {}", path.display(), error)))?;

        tracing::debug!(
            kind = R::KIND.as_str(),
            id,
            bytes = bytes.len(),
            "record written"
        );
        Ok(())
    }

    pub fn exists(&self, kind: RecordKind, id: &str) -> bool {
        self.path_for(kind, id).map(|path| path.is_file()).unwrap_or(false)
    }

    /// Ids currently stored for `kind`, ascending. Dated logs sort chronologically.
    pub fn list_ids(&self, kind: RecordKind) -> AppResult<Vec<String>> {
        let mut ids = match kind {
            RecordKind::DailyLog => {
                self.scan_dir(LOGS_DIR, |stem| parse_date_key(stem).ok().map(date_key))?
            }
            RecordKind::WeeklyReview => self.scan_dir(REVIEWS_DIR, |stem| {
                stem.strip_prefix(REVIEW_PREFIX)
                    .filter(|label| is_week_label(label))
                    .map(str::to_string)
            })?,
            singleton => singleton
                .singleton_id()
                .filter(|id| self.exists(singleton, id))
                .map(|id| vec![id.to_string()])
                .unwrap_or_default(),
        };
        ids.sort();
        Ok(ids)
    }

    /// Deletes the document. `Ok(false)` when there was nothing to delete.
    pub fn remove(&self, kind: RecordKind, id: &str) -> AppResult<bool> {
        let path = self.path_for(kind, id)?;
        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(&path);
        }
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(AppError::Write(format!("{}: {}", path.display(), error))),
        }
    }

    /// Renames the document to `<file>.corrupt-<timestamp>`.
    pub fn quarantine(&self, kind: RecordKind, id: &str) -> AppResult<Option<PathBuf>> {
        let path = self.path_for(kind, id)?;
        if !path.is_file() {
            return Ok(None);
        }
        let stamp = self.clock.now().format("%Y%m%dT%H%M%S");
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "record.json".to_string());
        let target = path.with_file_name(format!("{}.corrupt-{}", file_name, stamp));
        fs::rename(&path, &target)
            .map_err(|error| AppError::Write(format!("{}: {}", path.display(), error)))?;
        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(&path);
        }
        Ok(Some(target))
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Arc<Vec<u8>>> {
        match self.cache.as_ref() {
            Some(cache) => cache.read(path),
            None => fs::read(path).map(Arc::new),
        }
    }

    fn scan_dir<F>(&self, rel: &str, accept: F) -> AppResult<Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dir = self.root.join(rel);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(AppError::Io(error.to_string())),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| AppError::Io(error.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|value| value.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|value| value.to_str()) else {
                continue;
            };
            if let Some(id) = accept(stem) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

fn ensure_topology(root: &Path) -> AppResult<()> {
    for dir in [root.to_path_buf(), root.join(LOGS_DIR), root.join(REVIEWS_DIR)] {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|error| AppError::Io(format!("{}: {}", dir.display(), error)))?;
        }
    }
    Ok(())
}

/// Write-to-temp-then-rename in the target directory, so readers of `path`
/// see either the old or the new full document.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "record path has no parent"))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let result = write_then_rename(&tmp, path, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}
