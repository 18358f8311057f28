use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use walkdir::{DirEntry, WalkDir};

use crate::domain::{ports::DocumentParser, Document, DomainError};

/// Routes files to parsers by lower-case extension.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, extension: &str, parser: Arc<dyn DocumentParser>) -> Self {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.parsers.insert(extension, parser);
        self
    }

    pub fn parser_for(&self, path: &Path) -> Option<&Arc<dyn DocumentParser>> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.parsers.get(&extension)
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

/// Loads every supported file under a root directory into documents.
pub struct CorpusLoader {
    root: PathBuf,
    registry: ParserRegistry,
    parse_timeout: Duration,
}

impl CorpusLoader {
    pub fn new(root: impl Into<PathBuf>, registry: ParserRegistry, parse_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            registry,
            parse_timeout,
        }
    }

    /// Eligible files in deterministic (path-sorted) order.
    pub fn discover(&self) -> Result<Vec<PathBuf>, DomainError> {
        if !self.root.exists() {
            return Err(DomainError::configuration(format!(
                "data directory {} does not exist",
                self.root.display()
            )));
        }
        if !self.root.is_dir() {
            return Err(DomainError::configuration(format!(
                "data path {} is not a directory",
                self.root.display()
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                DomainError::configuration(format!(
                    "failed to walk {}: {e}",
                    self.root.display()
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if self.registry.parser_for(entry.path()).is_none() {
                tracing::debug!(path = %entry.path().display(), "skipping unsupported file");
                continue;
            }
            files.push(entry.into_path());
        }

        if files.is_empty() {
            return Err(DomainError::configuration(format!(
                "data directory {} contains no supported files",
                self.root.display()
            )));
        }
        Ok(files)
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn load(&self) -> Result<Vec<Document>, DomainError> {
        let files = self.discover()?;
        let mut corpus = Vec::new();

        for path in &files {
            let documents = self.load_file(path).await?;
            tracing::debug!(path = %path.display(), documents = documents.len(), "file parsed");
            corpus.extend(documents);
        }

        tracing::info!(files = files.len(), documents = corpus.len(), "corpus loaded");
        Ok(corpus)
    }

    async fn load_file(&self, path: &Path) -> Result<Vec<Document>, DomainError> {
        let parser = self.registry.parser_for(path).ok_or_else(|| {
            DomainError::internal(format!("no parser for {}", path.display()))
        })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DomainError::ingestion(format!("failed to read {}: {e}", path.display()))
        })?;

        let documents = tokio::time::timeout(self.parse_timeout, parser.parse(path, bytes))
            .await
            .map_err(|_| {
                DomainError::ingestion(format!(
                    "{} parser timed out on {} after {:?}",
                    parser.name(),
                    path.display(),
                    self.parse_timeout
                ))
            })?
            .map_err(|e| match e {
                DomainError::Ingestion(_) => e,
                other => DomainError::ingestion(format!(
                    "{} parser failed on {}: {other}",
                    parser.name(),
                    path.display()
                )),
            })?;

        if documents.is_empty() {
            return Err(DomainError::ingestion(format!(
                "{} produced no documents",
                path.display()
            )));
        }

        Ok(documents
            .into_iter()
            .enumerate()
            .map(|(position, mut doc)| {
                doc.source.position = position;
                doc
            })
            .collect())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
