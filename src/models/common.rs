use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

/// ApiResult
///
/// The uniform response envelope. Exactly one of `result` or `errors` carries
/// information: successful calls leave `errors` empty, failed calls leave
/// `result` null.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiResult<T> {
    pub succeeded: bool,
    pub result: Option<T>,
    pub errors: Vec<String>,
}

impl<T> ApiResult<T> {
    pub fn success(result: T) -> Self {
        Self {
            succeeded: true,
            result: Some(result),
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            succeeded: false,
            result: None,
            errors,
        }
    }
}

/// PageQuery
///
/// Paging parameters accepted by every list endpoint.
/// `pageSize <= 0` requests every row; `pageIndex < 1` is treated as the first page.
/// Larger sizes are capped at [`MAX_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page_index: i64,
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: 10,
        }
    }
}

/// Upper bound on a bounded page.
pub const MAX_PAGE_SIZE: i64 = 1000;

impl PageQuery {
    pub fn window(&self) -> PageWindow {
        if self.page_size <= 0 {
            return PageWindow { index: 1, size: None };
        }
        PageWindow {
            index: self.page_index.max(1),
            size: Some(self.page_size.min(MAX_PAGE_SIZE)),
        }
    }
}

/// A resolved page: `size == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub index: i64,
    pub size: Option<i64>,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        match self.size {
            // Pages past the end just come back empty.
            Some(size) => (self.index - 1).saturating_mul(size),
            None => 0,
        }
    }

    pub fn limit(&self) -> Option<i64> {
        self.size
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Matched case-insensitively as a substring. Blank keywords match nothing.
    pub keyword: Option<String>,
}

/// PageList
///
/// One page of items plus enough bookkeeping for a client to render pagination.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageList<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_index: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PageList<T> {
    pub fn new(items: Vec<T>, total_count: i64, window: PageWindow) -> Self {
        let (page_size, total_pages) = match window.size {
            Some(size) => (size, total_count / size + i64::from(total_count % size != 0)),
            None => (total_count, i64::from(total_count > 0)),
        };

        Self {
            items,
            total_count,
            page_index: window.index,
            page_size,
            total_pages,
        }
    }

    /// Converts every item, keeping the paging bookkeeping. Stops at the first error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<PageList<U>, E> {
        Ok(PageList {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total_count: self.total_count,
            page_index: self.page_index,
            page_size: self.page_size,
            total_pages: self.total_pages,
        })
    }
}
