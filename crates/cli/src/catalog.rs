//! JSON file catalog
//!
//! All audiobooks live in one pretty-printed JSON document. Writes go to a
//! temporary file in the same directory which is then renamed over the
//! catalog.

use earshot_core::{AppError, Audiobook, AudiobookId, CatalogStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    books: Vec<Audiobook>,
}

/// Audiobooks stored in a single JSON file
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    books: Vec<Audiobook>,
}

impl JsonCatalog {
    /// Reads the catalog at `path`; a missing file is an empty catalog
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let books = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => {
                let file: CatalogFile = serde_json::from_str(&contents).map_err(|e| {
                    AppError::persistence(format!("Catalog {} is not valid", path.display()), e)
                })?;
                file.books
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(AppError::persistence("Failed to read catalog", e)),
        };

        log::debug!("Opened catalog {} ({} books)", path.display(), books.len());
        Ok(Self { path, books })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn books(&self) -> &[Audiobook] {
        &self.books
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Finds a book by full id or by a unique id prefix
    pub fn find(&self, id_or_prefix: &str) -> Option<&Audiobook> {
        if let Ok(id) = AudiobookId::from_string(id_or_prefix) {
            return self.books.iter().find(|book| book.id == id);
        }

        let mut matches = self
            .books
            .iter()
            .filter(|book| book.id.as_string().starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(book), None) => Some(book),
            _ => None,
        }
    }

    /// Inserts or replaces a book and writes the catalog
    pub fn upsert(&mut self, book: Audiobook) -> Result<(), AppError> {
        match self.books.iter_mut().find(|existing| existing.id == book.id) {
            Some(existing) => *existing = book,
            None => self.books.push(book),
        }
        self.write()
    }

    fn write(&self) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::persistence("Failed to create catalog directory", e))?;

        let file = CatalogFile {
            books: self.books.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| AppError::persistence("Failed to serialize catalog", e))?;

        let write_err = |e| AppError::persistence("Failed to write catalog", e);
        let mut temp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        temp.write_all(json.as_bytes()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&self.path).map_err(|e| write_err(e.error))?;

        Ok(())
    }
}

impl CatalogStore for JsonCatalog {
    fn save(&mut self, book: &Audiobook) -> earshot_core::Result<()> {
        self.upsert(book.clone())
    }
}
