//! Pagination wrapper for list endpoints.

use serde::{Deserialize, Serialize};

/// One page of results. `page` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, size: u32, total: i64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            (total + size as i64 - 1) / size as i64
        };

        Self {
            items,
            page,
            size,
            total,
            total_pages,
        }
    }
}
