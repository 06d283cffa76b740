use std::path::{Path, PathBuf};

use crate::domain::book::CURRENT_SCHEMA_VERSION;
use crate::domain::ExpenseBook;
use crate::storage::{BackupInfo, StorageBackend};

use super::errors::{CrmError, Result};

/// Facade that coordinates the open book, persistence and backups.
pub struct BookManager {
    pub current: Option<ExpenseBook>,
    current_name: Option<String>,
    current_path: Option<PathBuf>,
    storage: Box<dyn StorageBackend>,
}

impl BookManager {
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        Self {
            current: None,
            current_name: None,
            current_path: None,
            storage,
        }
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    /// Starts an unsaved book and makes it current.
    pub fn new_book(&mut self, name: &str) -> &mut ExpenseBook {
        self.current_name = None;
        self.current_path = None;
        self.current.insert(ExpenseBook::new(name.trim()))
    }

    pub fn load(&mut self, name: &str) -> Result<&ExpenseBook> {
        let book = self.storage.load(name)?;
        Self::ensure_schema_support(book.schema_version)?;
        let path = self.storage.book_path(name);
        tracing::info!(book = %name, expenses = book.expenses.len(), "book loaded");
        Ok(self.apply_load(book, path, Some(name.to_string())))
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<&ExpenseBook> {
        let book = self.storage.load_from_path(path)?;
        Self::ensure_schema_support(book.schema_version)?;
        Ok(self.apply_load(book, path.to_path_buf(), None))
    }

    pub fn save(&mut self) -> Result<PathBuf> {
        let book = self.current.as_ref().ok_or(CrmError::BookNotLoaded)?;
        if let Some(name) = self.current_name.clone() {
            let path = self.storage.save(book, &name)?;
            self.current_path = Some(path.clone());
            Ok(path)
        } else if let Some(path) = self.current_path.clone() {
            self.storage.save_to_path(book, &path)?;
            Ok(path)
        } else {
            Err(CrmError::Storage(
                "unable to determine save target for current book".into(),
            ))
        }
    }

    pub fn save_as(&mut self, name: &str) -> Result<PathBuf> {
        let book = self.current.as_ref().ok_or(CrmError::BookNotLoaded)?;
        let path = self.storage.save(book, name)?;
        self.current_name = Some(name.to_string());
        self.current_path = Some(path.clone());
        Ok(path)
    }

    pub fn backup(&self, note: Option<&str>) -> Result<PathBuf> {
        let book = self.current.as_ref().ok_or(CrmError::BookNotLoaded)?;
        let name = self
            .current_name
            .as_deref()
            .ok_or_else(|| CrmError::Storage("current book is unnamed".into()))?;
        self.storage.backup(book, name, note)
    }

    pub fn list_backups(&self, name: &str) -> Result<Vec<BackupInfo>> {
        self.storage.list_backups(name)
    }

    pub fn restore(&mut self, name: &str, backup_name: &str) -> Result<&ExpenseBook> {
        let book = self.storage.restore(name, backup_name)?;
        Self::ensure_schema_support(book.schema_version)?;
        let path = self.storage.book_path(name);
        Ok(self.apply_load(book, path, Some(name.to_string())))
    }

    pub fn current(&self) -> Result<&ExpenseBook> {
        self.current.as_ref().ok_or(CrmError::BookNotLoaded)
    }

    pub fn current_mut(&mut self) -> Result<&mut ExpenseBook> {
        self.current.as_mut().ok_or(CrmError::BookNotLoaded)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.current_name = None;
        self.current_path = None;
    }

    fn ensure_schema_support(schema_version: u8) -> Result<()> {
        if schema_version > CURRENT_SCHEMA_VERSION {
            return Err(CrmError::Storage(format!(
                "book schema v{} is newer than supported v{}",
                schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(())
    }

    fn apply_load(&mut self, book: ExpenseBook, path: PathBuf, name: Option<String>) -> &ExpenseBook {
        self.current_path = Some(path);
        self.current_name = name;
        self.current.insert(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_named_roundtrip() {
        let temp = tempdir().unwrap();
        let store = JsonStorage::new(Some(temp.path().to_path_buf()), Some(3)).unwrap();
        let mut manager = BookManager::new(Box::new(store));

        manager.new_book("Demo");
        let path = manager.save_as("demo-boat").expect("save book");
        assert!(path.exists());

        manager.clear();
        assert!(matches!(manager.current(), Err(CrmError::BookNotLoaded)));
        let book = manager.load("demo-boat").expect("load book");
        assert_eq!(book.name, "Demo");
        assert_eq!(manager.current_name(), Some("demo-boat"));
        assert!(manager.current_path().is_some());
    }

    #[test]
    fn unnamed_book_cannot_be_saved_or_backed_up() {
        let temp = tempdir().unwrap();
        let store = JsonStorage::new(Some(temp.path().to_path_buf()), None).unwrap();
        let mut manager = BookManager::new(Box::new(store));
        assert!(matches!(manager.save(), Err(CrmError::BookNotLoaded)));

        manager.new_book("Draft");
        assert!(matches!(manager.save(), Err(CrmError::Storage(_))));
        assert!(manager.backup(None).is_err());
    }

    #[test]
    fn rejects_future_schema_versions() {
        let temp = tempdir().unwrap();
        let store = JsonStorage::new(Some(temp.path().to_path_buf()), Some(3)).unwrap();
        let mut manager = BookManager::new(Box::new(store));

        let path = temp.path().join("future.json");
        let mut book = ExpenseBook::new("Future");
        book.schema_version = CURRENT_SCHEMA_VERSION + 5;
        fs::write(&path, serde_json::to_string(&book).unwrap()).unwrap();

        match manager.load_from_path(&path) {
            Err(CrmError::Storage(message)) => {
                assert!(message.contains("newer"), "unexpected error: {message}");
            }
            Err(other) => panic!("expected storage error, got {other:?}"),
            Ok(_) => panic!("future schema should not load"),
        }
    }
}
