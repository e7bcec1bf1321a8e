// Cursor-based pagination contract shared by every list operation

use serde::{Deserialize, Serialize};

/// Sort direction for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Opaque resume position returned by a previous page.
///
/// Cursors are scoped to the query path that produced them: group-ordered
/// paths hand out the last record's id, index-ordered paths hand out its
/// creation instant in epoch milliseconds. Reusing a cursor across paths is
/// treated as requesting the first page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cursor {
    /// Creation instant in epoch milliseconds (index-ordered paths)
    Instant(i64),
    /// Entity id (discriminator-ordered paths)
    Id(String),
}

/// Pagination parameters for list operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum page size; each store applies its own default when absent
    pub limit: Option<u32>,
    /// Cursor from a prior page of the same query path
    pub cursor: Option<Cursor>,
}

impl Pagination {
    /// Pagination with an explicit limit and no cursor
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            cursor: None,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Whether more results exist past this page
    pub has_more: bool,
    /// The last returned record's natural sort attribute; `None` on an empty page
    pub cursor: Option<Cursor>,
}
