//! In-memory doubles for the pipeline's collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use earthdata::{CatalogClient, CatalogError, CatalogResult, Granule, GranuleQuery, OpenOptions};
use storage::{CacheKey, ResponseCache};
use tempo_common::{Dataset, Product, Selection};

#[derive(Debug, Clone)]
enum Scripted {
    Groups(Vec<Granule>, [Dataset; 3]),
    SearchFails(String),
    OpenFails(Vec<Granule>, String),
}

/// A catalog whose answers are scripted per product.
///
/// Products with nothing scripted return no granules. Opening applies the
/// requested window the way the real catalog does.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    products: HashMap<String, Scripted>,
    authenticated: bool,
    searches: AtomicUsize,
    opens: AtomicUsize,
    queries: Mutex<Vec<GranuleQuery>>,
}

fn fake_granule(product: Product, time_start: DateTime<Utc>) -> Granule {
    Granule {
        id: format!("G-{}-{}", product.short_name(), time_start.timestamp()),
        title: format!("{}_{}.nc", product.short_name(), time_start.format("%Y%m%dT%H%M%SZ")),
        time_start,
        time_end: None,
        data_links: vec![format!(
            "https://data.example.test/{}/{}.nc",
            product.short_name(),
            time_start.timestamp()
        )],
    }
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            authenticated: true,
            ..Default::default()
        }
    }

    /// Serve `groups` (root, product, geolocation) for `product`.
    pub fn with_product(mut self, product: Product, groups: [Dataset; 3]) -> Self {
        let granules = groups[0]
            .time()
            .iter()
            .map(|t| fake_granule(product, *t))
            .collect();
        self.products
            .insert(product.short_name().to_string(), Scripted::Groups(granules, groups));
        self
    }

    /// Make the search for `product` fail.
    pub fn with_search_failure(mut self, product: Product, message: &str) -> Self {
        self.products.insert(
            product.short_name().to_string(),
            Scripted::SearchFails(message.to_string()),
        );
        self
    }

    /// Find one granule for `product` in any window, then fail to open it.
    pub fn with_open_failure(mut self, product: Product, message: &str) -> Self {
        let granule = fake_granule(product, Utc::now());
        self.products.insert(
            product.short_name().to_string(),
            Scripted::OpenFails(vec![granule], message.to_string()),
        );
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Every query received so far.
    pub fn queries(&self) -> Vec<GranuleQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn scripted_for(&self, granules: &[Granule]) -> Option<&Scripted> {
        let first = granules.first()?;
        self.products.values().find(|s| match s {
            Scripted::Groups(g, _) | Scripted::OpenFails(g, _) => g.iter().any(|x| x.id == first.id),
            Scripted::SearchFails(_) => false,
        })
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search(&self, query: &GranuleQuery) -> CatalogResult<Vec<Granule>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        match self.products.get(&query.short_name) {
            None => Ok(Vec::new()),
            Some(Scripted::SearchFails(message)) => Err(CatalogError::Search(message.clone())),
            Some(Scripted::OpenFails(granules, _)) => Ok(granules.clone()),
            Some(Scripted::Groups(granules, _)) => {
                let mut found: Vec<Granule> = granules
                    .iter()
                    .filter(|g| g.time_start >= query.start && g.time_start <= query.end)
                    .cloned()
                    .collect();
                if let Some(count) = query.count {
                    found.truncate(count);
                }
                Ok(found)
            }
        }
    }

    async fn open(
        &self,
        granules: &[Granule],
        group: Option<&str>,
        options: &OpenOptions,
    ) -> CatalogResult<Dataset> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let groups = match self.scripted_for(granules) {
            Some(Scripted::Groups(_, groups)) => groups,
            Some(Scripted::OpenFails(_, message)) => return Err(CatalogError::Download(message.clone())),
            _ => return Err(CatalogError::Download("unknown granules".to_string())),
        };

        let dataset = match group {
            None => &groups[0],
            Some("product") => &groups[1],
            Some("geolocation") => &groups[2],
            Some(other) => return Err(CatalogError::Download(format!("no group {}", other))),
        };

        // Only the time steps of the granules asked for.
        let steps: Vec<usize> = dataset
            .time()
            .iter()
            .enumerate()
            .filter(|(_, t)| granules.iter().any(|g| g.time_start == **t))
            .map(|(i, _)| i)
            .collect();
        let opened = dataset.isel(&Selection {
            time: Some(steps),
            ..Selection::default()
        })?;

        match &options.window {
            Some(bbox) => Ok(opened.select_box(bbox)?),
            None => Ok(opened),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// A cache whose backend is always unreachable.
#[derive(Debug, Default)]
pub struct UnavailableCache {
    sets: AtomicUsize,
}

impl UnavailableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes attempted (and dropped) so far.
    pub fn set_attempts(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseCache for UnavailableCache {
    async fn get(&self, _key: &CacheKey) -> Option<Bytes> {
        None
    }

    async fn set(&self, _key: &CacheKey, _value: Bytes, _ttl: Duration) {
        self.sets.fetch_add(1, Ordering::SeqCst);
    }

    async fn ping(&self) -> bool {
        false
    }
}
