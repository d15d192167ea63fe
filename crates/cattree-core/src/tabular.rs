//! Two-column import/export of the hierarchy
//!
//! Column 0 holds a category name, column 1 its parent chain. On export the
//! chain lists every ancestor from the root down, each followed by `/`
//! (`books/fiction/`), and is empty for roots.
//!
//! Import makes sure each parent exists as its own path from the root scope
//! before inserting the row. A bare parent name that appears before its own
//! row is therefore created at the top level; if that row later places it
//! deeper, the two nodes are not merged.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::engine::{HierarchyEngine, PATH_SEPARATOR};
use crate::error::{CatTreeError, Result};
use crate::store::{Category, CategoryId, CategoryStore};

pub const HEADER: [&str; 2] = ["category", "parent"];

/// One (category, parent chain) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub category: String,
    pub parent: Option<String>,
}

impl Row {
    pub fn new(category: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            category: category.into(),
            parent: parent.map(str::to_string),
        }
    }

    fn parent_path(&self) -> Option<&str> {
        self.parent
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// A row the import could not apply
#[derive(Debug)]
pub struct RowFailure {
    /// 1-based position in the input
    pub row: usize,
    pub error: CatTreeError,
}

/// Summary of a bulk import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Rows processed
    pub rows: usize,
    /// Categories created, parents included
    pub created: usize,
    /// Rows without a category name
    pub skipped: usize,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} rows: {} categories created, {} skipped, {} failed.",
            self.rows,
            self.created,
            self.skipped,
            self.failures.len()
        )
    }
}

/// Apply rows to the engine in order.
///
/// Per-row problems (bad names, duplicates) are collected in the report.
/// A store failure stops the import; earlier rows stay applied.
pub fn decode_rows<S, I>(engine: &mut HierarchyEngine<S>, rows: I) -> Result<ImportReport>
where
    S: CategoryStore,
    I: IntoIterator<Item = Row>,
{
    let mut report = ImportReport::default();

    for (index, row) in rows.into_iter().enumerate() {
        let position = index + 1;
        report.rows += 1;

        if row.category.trim().is_empty() {
            tracing::warn!(row = position, "skipping row without a category name");
            report.skipped += 1;
            continue;
        }

        let parent = row.parent_path();

        if let Some(parent) = parent {
            match engine.add_category(parent, None) {
                Ok(added) => report.created += added.created.len(),
                Err(CatTreeError::DuplicateAtScope { .. }) => {}
                Err(e) if e.is_domain() => {
                    tracing::warn!(row = position, error = %e, "parent rejected");
                    report.failures.push(RowFailure {
                        row: position,
                        error: e,
                    });
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        match engine.add_category(&row.category, parent) {
            Ok(added) => report.created += added.created.len(),
            Err(e) if e.is_domain() => {
                tracing::warn!(row = position, error = %e, "row rejected");
                report.failures.push(RowFailure {
                    row: position,
                    error: e,
                });
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        rows = report.rows,
        created = report.created,
        failed = report.failures.len(),
        "import finished"
    );
    Ok(report)
}

/// Every category in store order with its ancestor chain
pub fn encode_rows<S: CategoryStore>(store: &S) -> Result<Vec<Row>> {
    let all = store.find_all()?;
    let by_id: HashMap<CategoryId, &Category> = all.iter().map(|c| (c.id, c)).collect();

    let mut rows = Vec::with_capacity(all.len());
    for category in &all {
        let mut ancestors = Vec::new();
        let mut next = category.parent;
        while let Some(id) = next {
            let parent = by_id.get(&id).ok_or_else(|| CatTreeError::CorruptStore {
                message: format!("category {} references missing parent {}", category.id, id),
            })?;
            ancestors.push(parent.name.as_str());
            next = parent.parent;
        }

        let mut chain = String::new();
        for name in ancestors.iter().rev() {
            chain.push_str(name);
            chain.push(PATH_SEPARATOR);
        }

        rows.push(Row {
            category: category.name.clone(),
            parent: Some(chain),
        });
    }

    Ok(rows)
}

/// Read rows from CSV. Rows may have one or two cells.
pub fn read_rows<R: Read>(reader: R, has_header: bool) -> Result<Vec<Row>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let category = record.get(0).unwrap_or_default().to_string();
        let parent = record
            .get(1)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        rows.push(Row { category, parent });
    }
    Ok(rows)
}

pub fn write_rows<W: Write>(writer: W, rows: &[Row], header: bool) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    if header {
        csv_writer.write_record(HEADER)?;
    }
    for row in rows {
        csv_writer.write_record([row.category.as_str(), row.parent.as_deref().unwrap_or("")])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_csv(path: &Path, has_header: bool) -> Result<Vec<Row>> {
    read_rows(File::open(path)?, has_header)
}

pub fn write_csv(path: &Path, rows: &[Row], header: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_rows(File::create(path)?, rows, header)
}

/// Export the whole store to a CSV file and return the number of rows
pub fn export_csv<S: CategoryStore>(store: &S, path: &Path, header: bool) -> Result<usize> {
    let rows = encode_rows(store)?;
    write_csv(path, &rows, header)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "exported categories");
    Ok(rows.len())
}

pub fn import_csv<S: CategoryStore>(
    engine: &mut HierarchyEngine<S>,
    path: &Path,
    has_header: bool,
) -> Result<ImportReport> {
    let rows = read_csv(path, has_header)?;
    decode_rows(engine, rows)
}
