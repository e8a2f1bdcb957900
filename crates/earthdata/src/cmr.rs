//! CMR-backed [`CatalogClient`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tempo_common::{Dataset, Dimension};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::auth::{EarthdataCredentials, EarthdataSession, DEFAULT_URS_URL};
use crate::client::{CatalogClient, Granule, GranuleQuery, OpenOptions};
use crate::error::{CatalogError, CatalogResult};
use crate::spool::GranuleSpool;

pub const DEFAULT_CMR_URL: &str = "https://cmr.earthdata.nasa.gov/search";

const DATA_LINK_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/data#";
const MAX_PAGE_SIZE: usize = 2000;

/// Configuration for [`CmrCatalog`].
#[derive(Debug, Clone)]
pub struct CmrConfig {
    pub search_url: String,
    pub urs_url: String,
    /// Directory downloaded granules are spooled in.
    pub spool_dir: PathBuf,
    /// Spooled granules older than this are deleted.
    pub spool_max_age: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for CmrConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_CMR_URL.to_string(),
            urs_url: DEFAULT_URS_URL.to_string(),
            spool_dir: std::env::temp_dir().join("tempo-granules"),
            spool_max_age: Duration::from_secs(3600),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CmrResponse {
    feed: CmrFeed,
}

#[derive(Debug, Deserialize)]
struct CmrFeed {
    #[serde(default)]
    entry: Vec<CmrEntry>,
}

#[derive(Debug, Deserialize)]
struct CmrEntry {
    id: String,
    #[serde(default)]
    title: String,
    time_start: String,
    time_end: Option<String>,
    #[serde(default)]
    links: Vec<CmrLink>,
}

#[derive(Debug, Deserialize)]
struct CmrLink {
    rel: String,
    href: String,
}

/// Catalog client for NASA's Common Metadata Repository.
pub struct CmrCatalog {
    client: Client,
    config: CmrConfig,
    session: EarthdataSession,
    spool: GranuleSpool,
}

impl CmrCatalog {
    pub fn new(config: CmrConfig, session: EarthdataSession) -> CatalogResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("tempo-air-quality/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let spool = GranuleSpool::new(&config.spool_dir, config.spool_max_age)?
            .with_grace(config.request_timeout);

        Ok(Self {
            client,
            config,
            session,
            spool,
        })
    }

    /// Build a catalog and log in with the given credentials.
    ///
    /// Authentication failures leave the catalog usable but unauthenticated.
    pub async fn connect(
        config: CmrConfig,
        credentials: Option<&EarthdataCredentials>,
    ) -> CatalogResult<Self> {
        let mut catalog = Self::new(config, EarthdataSession::anonymous())?;
        catalog.session = EarthdataSession::login_or_anonymous(
            &catalog.client,
            &catalog.config.urs_url,
            credentials,
        )
        .await;
        Ok(catalog)
    }

    /// Download a granule into the spool unless it is already there.
    #[instrument(skip(self, granule), fields(granule = %granule.id))]
    async fn fetch(&self, granule: &Granule) -> CatalogResult<PathBuf> {
        let final_path = self.spool.path_for(granule);
        if self.spool.claim(&final_path).await? {
            debug!(path = %final_path.display(), "Granule already spooled");
            return Ok(final_path);
        }

        let url = granule.data_links.first().ok_or_else(|| {
            CatalogError::Download(format!("granule {} has no data link", granule.id))
        })?;

        let partial = self.spool.partial_path(&final_path);
        let result = self.download_to(url, &partial).await;
        if let Err(e) = result {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        fs::rename(&partial, &final_path).await?;

        info!(url = %url, path = %final_path.display(), "Downloaded granule");
        Ok(final_path)
    }

    async fn download_to(&self, url: &str, path: &Path) -> CatalogResult<()> {
        let response = self.session.authorize(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Download(format!("{} returned {}", url, status)));
        }

        let mut file = fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url = %url, bytes = written, "Download stream complete");
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for CmrCatalog {
    #[instrument(skip(self, query), fields(short_name = %query.short_name))]
    async fn search(&self, query: &GranuleQuery) -> CatalogResult<Vec<Granule>> {
        let url = format!("{}/granules.json", self.config.search_url.trim_end_matches('/'));
        let response = self
            .session
            .authorize(self.client.get(&url).query(&search_params(query)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Search(format!("CMR returned {}", status)));
        }

        let body: CmrResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Search(format!("invalid CMR response: {}", e)))?;

        let mut granules = granules_from_feed(body);
        if let Some(count) = query.count {
            granules.truncate(count);
        }

        info!(found = granules.len(), "Granule search complete");
        Ok(granules)
    }

    async fn open(
        &self,
        granules: &[Granule],
        group: Option<&str>,
        options: &OpenOptions,
    ) -> CatalogResult<Dataset> {
        check_options(options)?;

        if let Err(e) = self.spool.prune().await {
            warn!(error = %e, "Failed to prune granule spool");
        }

        let paths =
            futures::future::try_join_all(granules.iter().map(|g| self.fetch(g))).await?;

        let group = group.map(str::to_string);
        let window = options.window;
        let parts = tokio::task::spawn_blocking(move || {
            paths
                .iter()
                .map(|path| netcdf_parser::read_group(path, group.as_deref(), window.as_ref()))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))??;

        Ok(Dataset::concat_time(parts)?)
    }

    fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}

fn check_options(options: &OpenOptions) -> CatalogResult<()> {
    if options.concat_dim != Dimension::Time {
        return Err(CatalogError::Unsupported(format!(
            "concatenation along {}",
            options.concat_dim.name()
        )));
    }
    if !options.minimal_load {
        return Err(CatalogError::Unsupported("non-minimal load".to_string()));
    }
    Ok(())
}

fn search_params(query: &GranuleQuery) -> Vec<(&'static str, String)> {
    let page_size = query.count.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    vec![
        ("short_name", query.short_name.clone()),
        ("version", query.version.clone()),
        (
            "temporal",
            format!(
                "{},{}",
                query.start.format("%Y-%m-%dT%H:%M:%SZ"),
                query.end.format("%Y-%m-%dT%H:%M:%SZ")
            ),
        ),
        ("page_size", page_size.to_string()),
        ("sort_key", "start_date".to_string()),
    ]
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn granules_from_feed(response: CmrResponse) -> Vec<Granule> {
    let mut granules: Vec<Granule> = response
        .feed
        .entry
        .into_iter()
        .filter_map(|entry| {
            let Some(time_start) = parse_time(&entry.time_start) else {
                warn!(id = %entry.id, "Skipping granule with unparseable time_start");
                return None;
            };
            let data_links = entry
                .links
                .into_iter()
                .filter(|l| {
                    l.rel == DATA_LINK_REL
                        && l.href.starts_with("https://")
                        && l.href.ends_with(".nc")
                })
                .map(|l| l.href)
                .collect();
            Some(Granule {
                id: entry.id,
                title: entry.title,
                time_start,
                time_end: entry.time_end.as_deref().and_then(parse_time),
                data_links,
            })
        })
        .collect();

    granules.sort_by_key(|g| g.time_start);
    granules
}
