//! The catalog seam: granule search and multi-granule opening.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempo_common::{BoundingBox, Dataset, Dimension};

use crate::error::CatalogResult;

/// A single data file in the remote archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Granule {
    pub id: String,
    pub title: String,
    pub time_start: DateTime<Utc>,
    pub time_end: Option<DateTime<Utc>>,
    /// Direct HTTPS download links for the data file.
    pub data_links: Vec<String>,
}

/// Parameters for a granule search.
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleQuery {
    pub short_name: String,
    pub version: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Upper bound on returned granules. `None` returns one page.
    pub count: Option<usize>,
}

/// How variables present in more than one source are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Keep the value from the first source that defines it.
    #[default]
    FirstWins,
}

/// Options for [`CatalogClient::open`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOptions {
    /// Dimension granules are concatenated along. Only time is supported.
    pub concat_dim: Dimension,
    pub conflict: ConflictPolicy,
    /// Only variables indexed by `concat_dim` are concatenated; all others
    /// come from the first granule. `false` is rejected.
    pub minimal_load: bool,
    /// Spatial window applied while reading, if any.
    pub window: Option<BoundingBox>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            concat_dim: Dimension::Time,
            conflict: ConflictPolicy::FirstWins,
            minimal_load: true,
            window: None,
        }
    }
}

impl OpenOptions {
    pub fn with_window(mut self, window: BoundingBox) -> Self {
        self.window = Some(window);
        self
    }
}

/// Remote granule catalog.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Find granules matching the query, ordered by start time.
    async fn search(&self, query: &GranuleQuery) -> CatalogResult<Vec<Granule>>;

    /// Open one group (`None` = root) of the given granules as a single
    /// dataset concatenated along time.
    async fn open(
        &self,
        granules: &[Granule],
        group: Option<&str>,
        options: &OpenOptions,
    ) -> CatalogResult<Dataset>;

    /// Whether the client holds usable Earthdata credentials.
    fn is_authenticated(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_open_options() {
        let options = OpenOptions::default();
        assert_eq!(options.concat_dim, Dimension::Time);
        assert_eq!(options.conflict, ConflictPolicy::FirstWins);
        assert!(options.minimal_load);
        assert!(options.window.is_none());
    }

    #[test]
    fn test_with_window() {
        let bbox = BoundingBox::new(39.9, 40.1, -75.1, -74.9);
        let options = OpenOptions::default().with_window(bbox);
        assert_eq!(options.window, Some(bbox));
    }
}
