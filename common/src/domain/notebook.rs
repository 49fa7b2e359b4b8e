use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::new_id;

/// Groups source documents, conversations, crawl jobs, and evaluation
/// datasets. Owns all of those by id; deleting a notebook
/// cascades to each (enforced by the repository, not by this value type).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notebook {
    #[must_use]
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}
