//! List-request parameters in the admin API's filter/sort/pagination
//! conventions. The wire encoding of these lives in the client crate; this
//! module only defines the request shapes.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSpec {
    pub key: String,
    pub operation: FilterOperation,
    pub value: FilterValue,
}

impl FilterSpec {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operation: FilterOperation::Eq,
            value: FilterValue::Scalar(value.into()),
        }
    }

    pub fn value_in(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            operation: FilterOperation::ValueIn,
            value: FilterValue::List(values),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperation {
    Eq,
    Neq,
    ValueIn,
    Contains,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    Ascending,
    Descending,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// `All` is the sentinel requesting every result in one page; callers assume
/// no further pagination is needed within one poll cycle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageLimit {
    #[default]
    All,
    Limited(u32),
}

// ---------------------------------------------------------------------------
// Request bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestConfig {
    #[serde(default)]
    pub filter: Vec<FilterSpec>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub limit: PageLimit,
}

impl RequestConfig {
    /// Everything, unfiltered, in one page.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_filters(filter: Vec<FilterSpec>) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}
