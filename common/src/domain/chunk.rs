use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::new_id;

/// A contiguous substring of a document's extracted text, with the exact
/// `[char_start, char_end)` offsets into that text. Owned
/// by exactly one document; deleting a document cascades to its chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub char_start: usize,
    pub char_end: usize,
    pub chunk_index: usize,
    pub token_count: usize,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    #[must_use]
    pub fn new(
        document_id: String,
        content: String,
        char_start: usize,
        char_end: usize,
        chunk_index: usize,
        token_count: usize,
    ) -> Self {
        Self {
            id: new_id(),
            document_id,
            content,
            char_start,
            char_end,
            chunk_index,
            token_count,
            embedding: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}
