use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::{
        errors::CrmError,
        utils::{ensure_dir, slugify, write_atomic, PathResolver},
    },
    domain::ExpenseBook,
};

use super::{Result, StorageBackend};

const BOOK_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%6f";
const STAMP_LEN: usize = 21;
pub const DEFAULT_RETENTION: usize = 5;

/// One backup file of a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Books as pretty JSON files under `<base>/books`, backups under `<base>/backups/<book>`.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    books_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let books_dir = PathResolver::book_dir_in(&app_root);
        let backups_dir = PathResolver::backup_dir_in(&app_root);
        ensure_dir(&books_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root: app_root,
            books_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    fn write_backup(&self, name: &str, json: &str, note: Option<&str>) -> Result<PathBuf> {
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let mut file_stem = format!(
            "{}_{}",
            canonical_name(name),
            Utc::now().format(BACKUP_TIMESTAMP_FORMAT)
        );
        if let Some(label) = note.and_then(slugify) {
            file_stem.push('_');
            file_stem.push_str(&label);
        }
        let path = dir.join(format!("{file_stem}.{BOOK_EXTENSION}"));
        write_atomic(&path, json)?;
        self.prune_backups(name)?;
        tracing::debug!(path = %path.display(), "backup written");
        Ok(path)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for entry in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::warn!(path = %entry.path.display(), %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    /// Backs up the previous file, if any, before overwriting it.
    fn save(&self, book: &ExpenseBook, name: &str) -> Result<PathBuf> {
        let path = self.book_path(name);
        if path.exists() {
            let previous = fs::read_to_string(&path)?;
            self.write_backup(name, &previous, None)?;
        }
        save_book_to_path(book, &path)?;
        tracing::info!(book = %name, path = %path.display(), "book saved");
        Ok(path)
    }

    fn load(&self, name: &str) -> Result<ExpenseBook> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(CrmError::not_found("Book", name));
        }
        load_book_from_path(&path)
    }

    fn list_books(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.books_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn book_path(&self, name: &str) -> PathBuf {
        self.books_dir
            .join(format!("{}.{}", canonical_name(name), BOOK_EXTENSION))
    }

    fn backup(&self, book: &ExpenseBook, name: &str, note: Option<&str>) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(book)?;
        self.write_backup(name, &json, note)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<BackupInfo>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", canonical_name(name));
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };
            let (created_at, note) = parse_backup_name(&file_name, &prefix);
            entries.push(BackupInfo {
                file_name,
                path,
                created_at,
                note,
            });
        }
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(entries)
    }

    fn restore(&self, name: &str, backup_name: &str) -> Result<ExpenseBook> {
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(CrmError::Storage(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        let book = load_book_from_path(&backup_path)?;
        let target = self.book_path(name);
        if target.exists() {
            let current = fs::read_to_string(&target)?;
            self.write_backup(name, &current, Some("pre-restore"))?;
        }
        save_book_to_path(&book, &target)?;
        tracing::info!(book = %name, backup = %backup_name, "backup restored");
        Ok(book)
    }
}

pub fn save_book_to_path(book: &ExpenseBook, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(book)?;
    write_atomic(path, &json)
}

pub fn load_book_from_path(path: &Path) -> Result<ExpenseBook> {
    let data = fs::read_to_string(path)?;
    let book: ExpenseBook = serde_json::from_str(&data)?;
    Ok(book)
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "book".into()
    } else {
        sanitized
    }
}

/// Splits `<book>_<YYYYmmdd_HHMMSSffffff>[_<note>].json` into timestamp and note.
fn parse_backup_name(file_name: &str, prefix: &str) -> (Option<DateTime<Utc>>, Option<String>) {
    let Some(rest) = file_name
        .strip_suffix(&format!(".{BOOK_EXTENSION}"))
        .and_then(|stem| stem.strip_prefix(prefix))
    else {
        return (None, None);
    };
    if rest.len() < STAMP_LEN || !rest.is_char_boundary(STAMP_LEN) {
        return (None, None);
    }
    let (stamp, tail) = rest.split_at(STAMP_LEN);
    let note = tail
        .strip_prefix('_')
        .filter(|note| !note.is_empty())
        .map(str::to_string);
    (parse_stamp(stamp), note)
}

fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let (seconds, micros) = stamp.split_at(15);
    let micros: u32 = micros.parse().ok()?;
    let naive = NaiveDateTime::parse_from_str(seconds, "%Y%m%d_%H%M%S").ok()?;
    let naive = naive.with_nanosecond(micros * 1_000)?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}
