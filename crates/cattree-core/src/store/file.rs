//! Category store persisted to `categories.toml`

use std::fs;
use std::path::{Path, PathBuf};

use super::forest::{CategoryForest, ForestFile};
use super::{Category, CategoryId, CategoryStore, NewCategory};
use crate::error::Result;

pub const DEFAULT_STORE_FILE: &str = "categories.toml";

/// Arena store that rewrites its file after every mutation
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    forest: CategoryForest,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let forest = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let file: ForestFile = toml::from_str(&content)?;
            CategoryForest::from_file(file)?
        } else {
            CategoryForest::new()
        };

        tracing::debug!(path = %path.display(), categories = forest.len(), "opened category store");
        Ok(Self { path, forest })
    }

    /// Open `categories.toml` (or `file_name`) inside a base directory
    pub fn in_dir(base_dir: &Path, file_name: &str) -> Result<Self> {
        Self::open(base_dir.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn forest(&self) -> &CategoryForest {
        &self.forest
    }

    /// Apply `change` to a copy and keep it only once it is on disk
    fn commit<T>(&mut self, change: impl FnOnce(&mut CategoryForest) -> Result<T>) -> Result<T> {
        let mut next = self.forest.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        self.forest = next;
        Ok(out)
    }

    /// Write to a sibling temp file, then rename over the store file
    fn persist(&self, forest: &CategoryForest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(&forest.to_file())?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CategoryStore for FileStore {
    fn find_root_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.forest.find_root_by_name(name)
    }

    fn find_child_by_name_and_parent(
        &self,
        name: &str,
        parent: CategoryId,
    ) -> Result<Option<Category>> {
        self.forest.find_child_by_name_and_parent(name, parent)
    }

    fn find_all_roots(&self) -> Result<Vec<Category>> {
        self.forest.find_all_roots()
    }

    fn find_all_by_name(&self, name: &str) -> Result<Vec<Category>> {
        self.forest.find_all_by_name(name)
    }

    fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>> {
        self.forest.find_by_id(id)
    }

    fn find_children(&self, parent: CategoryId) -> Result<Vec<Category>> {
        self.forest.find_children(parent)
    }

    fn find_all(&self) -> Result<Vec<Category>> {
        self.forest.find_all()
    }

    fn save(&mut self, category: NewCategory) -> Result<Category> {
        self.commit(|forest| forest.save(category))
    }

    fn delete(&mut self, id: CategoryId) -> Result<()> {
        self.commit(|forest| forest.delete(id))
    }

    fn count(&self) -> Result<usize> {
        self.forest.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatTreeError;
    use tempfile::TempDir;

    #[test]
    fn missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::in_dir(dir.path(), DEFAULT_STORE_FILE).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn mutations_survive_reopen() {
        let dir = TempDir::new().unwrap();

        let mut store = FileStore::in_dir(dir.path(), DEFAULT_STORE_FILE).unwrap();
        let root = store.save(NewCategory::root("books")).unwrap();
        let fiction = store.save(NewCategory::child("fiction", root.id)).unwrap();
        store.save(NewCategory::child("poetry", root.id)).unwrap();
        store.delete(fiction.id).unwrap();

        let reopened = FileStore::in_dir(dir.path(), DEFAULT_STORE_FILE).unwrap();
        assert_eq!(reopened.count().unwrap(), 2);
        let children: Vec<_> = reopened
            .find_children(root.id)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(children, vec!["poetry"]);
        assert!(!dir.path().join("categories.toml.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::in_dir(dir.path(), DEFAULT_STORE_FILE).unwrap();
        let books = store.save(NewCategory::root("books")).unwrap();

        // a directory in the temp file's place makes every write fail
        let tmp = dir.path().join("categories.toml.tmp");
        fs::create_dir(&tmp).unwrap();

        assert!(store.save(NewCategory::root("music")).is_err());
        assert!(store.delete(books.id).is_err());
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.find_root_by_name("music").unwrap().is_none());
        assert!(store.find_root_by_name("books").unwrap().is_some());

        fs::remove_dir(&tmp).unwrap();
        store.save(NewCategory::root("music")).unwrap();

        let reopened = FileStore::in_dir(dir.path(), DEFAULT_STORE_FILE).unwrap();
        assert_eq!(reopened.count().unwrap(), 2);
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_STORE_FILE);
        fs::write(
            &path,
            r#"
next_id = 3

[[categories]]
id = 1
name = "a"
parent = 2
created_at = "2024-01-01T00:00:00Z"

[[categories]]
id = 2
name = "b"
parent = 1
created_at = "2024-01-01T00:00:00Z"
"#,
        )
        .unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, CatTreeError::CorruptStore { .. }));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_STORE_FILE);
        fs::write(&path, "categories = 12\n[[").unwrap();
        assert!(matches!(
            FileStore::open(&path).unwrap_err(),
            CatTreeError::TomlDe(_)
        ));
    }
}
