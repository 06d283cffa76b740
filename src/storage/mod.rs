pub mod json_backend;

use std::path::{Path, PathBuf};

use crate::{core::errors::CrmError, domain::ExpenseBook};

pub type Result<T> = std::result::Result<T, CrmError>;

/// Abstraction over persistence backends capable of storing expense books and their backups.
pub trait StorageBackend: Send + Sync {
    fn save(&self, book: &ExpenseBook, name: &str) -> Result<PathBuf>;
    fn load(&self, name: &str) -> Result<ExpenseBook>;
    fn list_books(&self) -> Result<Vec<String>>;
    fn book_path(&self, name: &str) -> PathBuf;
    fn backup(&self, book: &ExpenseBook, name: &str, note: Option<&str>) -> Result<PathBuf>;
    /// Newest first.
    fn list_backups(&self, name: &str) -> Result<Vec<BackupInfo>>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<ExpenseBook>;

    fn save_to_path(&self, book: &ExpenseBook, path: &Path) -> Result<()> {
        json_backend::save_book_to_path(book, path)
    }

    fn load_from_path(&self, path: &Path) -> Result<ExpenseBook> {
        json_backend::load_book_from_path(path)
    }
}

pub use json_backend::{BackupInfo, JsonStorage, DEFAULT_RETENTION};
