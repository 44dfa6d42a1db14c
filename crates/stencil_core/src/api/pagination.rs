//! Page-number pagination for list actions.
//!
//! # Invariants
//! - `1 <= page_size <= max_page_size`, checked at construction.
//! - Page size never exceeds `max_page_size`.
//! - An empty result set still has one (empty) first page.
//! - Requests past the last page fail with `ApiError::InvalidPage`.

use crate::api::error::ApiError;
use crate::api::helpers::get_first_of;
use crate::config::{Settings, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use crate::model::base::ValidationError;
use crate::repo::{EntityQuery, SqlRecord};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use url::form_urlencoded;

pub const PAGE_QUERY_PARAM: &str = "page";
pub const PAGE_SIZE_QUERY_PARAM: &str = "page-size";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: u32,
    max_page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// One page of rendered results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Value>,
}

impl Pagination {
    /// # Errors
    /// - `page_size` is zero or larger than `max_page_size`.
    pub fn new(page_size: u32, max_page_size: u32) -> Result<Self, ValidationError> {
        if page_size == 0 || page_size > max_page_size {
            return Err(ValidationError::field(
                "page_size",
                format!("must be between 1 and {max_page_size}, got {page_size}"),
            ));
        }
        Ok(Self {
            page_size,
            max_page_size,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ValidationError> {
        Self::new(settings.page_size, settings.max_page_size)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Page size requested by `page-size`, capped at `max_page_size`.
    ///
    /// Missing, non-numeric or zero values fall back to the default.
    pub fn page_size_for(&self, query: &BTreeMap<String, String>) -> u32 {
        query
            .get(PAGE_SIZE_QUERY_PARAM)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|size| *size > 0)
            .map_or(self.page_size, |size| size.min(self.max_page_size))
    }

    /// Fetches and renders the requested page of `scope`.
    ///
    /// `page` accepts a 1-based number or `last`.
    pub fn paginate<E, F>(
        &self,
        scope: &EntityQuery<'_, E>,
        path: &str,
        query: &BTreeMap<String, String>,
        render: F,
    ) -> Result<Page, ApiError>
    where
        E: SqlRecord,
        F: Fn(&E) -> Result<Value, ApiError>,
    {
        let page_size = self.page_size_for(query);
        let count = scope.count()?;
        let num_pages = count.div_ceil(page_size as usize).max(1);

        let raw_page = get_first_of([query.get(PAGE_QUERY_PARAM).map(String::as_str), Some("1")])
            .unwrap_or("1");
        let page = if raw_page == "last" {
            num_pages
        } else {
            raw_page
                .trim()
                .parse::<usize>()
                .map_err(|_| ApiError::InvalidPage)?
        };
        if page == 0 || page > num_pages {
            return Err(ApiError::InvalidPage);
        }

        let offset = u32::try_from((page - 1) * page_size as usize)
            .map_err(|_| ApiError::InvalidPage)?;
        let results = scope
            .fetch_page(page_size, offset)?
            .iter()
            .map(render)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            count,
            next: (page < num_pages).then(|| page_link(path, query, Some(page + 1))),
            previous: (page > 1).then(|| {
                let previous = page - 1;
                page_link(path, query, (previous > 1).then_some(previous))
            }),
            results,
        })
    }
}

/// `path` with `query`, the page parameter replaced (or removed for the
/// first page). Keys and values are form-urlencoded.
fn page_link(path: &str, query: &BTreeMap<String, String>, page: Option<usize>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        if key != PAGE_QUERY_PARAM {
            serializer.append_pair(key, value);
        }
    }
    if let Some(page) = page {
        serializer.append_pair(PAGE_QUERY_PARAM, &page.to_string());
    }
    let encoded = serializer.finish();
    if encoded.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{encoded}")
    }
}
