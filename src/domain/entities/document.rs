use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parsed text from one source file, or from one section of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub text: String,
    pub source: SourceMetadata,
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: SourceMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            source,
            ingested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
    /// Position of this document among those produced from the same file.
    pub position: usize,
}

impl SourceMetadata {
    pub fn new(
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            position: 0,
        }
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_name: Option<String>,
    pub file_path: Option<String>,
}

impl From<&SourceMetadata> for ChunkMetadata {
    fn from(source: &SourceMetadata) -> Self {
        Self {
            file_name: Some(source.file_name.clone()),
            file_path: Some(source.file_path.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Splits content into chunks by paragraph boundaries.
///
/// Paragraphs are joined until they exceed `chunk_size`, then a new chunk starts.
/// A paragraph longer than `chunk_size` is cut at the last newline or space
/// that fits, so no chunk is ever longer than `chunk_size` bytes.
/// Each chunk is assigned a sequential index starting from 0.
pub fn chunk_content(document_id: Uuid, content: &str, chunk_size: usize) -> Vec<DocumentChunk> {
    let paragraphs = content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .flat_map(|paragraph| split_oversized(paragraph, chunk_size));

    let mut chunks = Vec::new();
    let mut current_chunk = String::new();
    let mut chunk_index = 0;

    for paragraph in paragraphs {
        let would_exceed = !current_chunk.is_empty()
            && current_chunk.len() + paragraph.len() + 2 > chunk_size;

        if would_exceed {
            chunks.push(DocumentChunk::new(document_id, &current_chunk, chunk_index));
            current_chunk.clear();
            chunk_index += 1;
        }

        if !current_chunk.is_empty() {
            current_chunk.push_str("\n\n");
        }
        current_chunk.push_str(paragraph);
    }

    if !current_chunk.is_empty() {
        chunks.push(DocumentChunk::new(document_id, current_chunk, chunk_index));
    }

    chunks
}

fn split_oversized(paragraph: &str, max_len: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut remaining = paragraph;

    while remaining.len() > max_len {
        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let split_at = remaining[..limit]
            .rfind(['\n', ' '])
            .map(|pos| pos + 1)
            .unwrap_or(limit);
        // A single char wider than `max_len` still has to make progress.
        let split_at = match split_at {
            0 => remaining.chars().next().map_or(remaining.len(), char::len_utf8),
            n => n,
        };

        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        pieces.push(remaining);
    }
    pieces
}

/// Chunks a parsed document, tagging every chunk with the document's source.
pub fn chunk_document(document: &Document, chunk_size: usize) -> Vec<DocumentChunk> {
    let metadata = ChunkMetadata::from(&document.source);
    chunk_content(document.id, &document.text, chunk_size)
        .into_iter()
        .map(|chunk| chunk.with_metadata(metadata.clone()))
        .collect()
}
