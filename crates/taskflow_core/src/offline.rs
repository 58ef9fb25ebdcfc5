//! Cache-first offline controller for the app's static assets.
//!
//! Follows the install / activate / fetch lifecycle of a browser service
//! worker. Storage and network access sit behind traits so the controller can
//! run against any cache backend.

use crate::error::AppError;
use std::collections::BTreeMap;

pub const CACHE_PREFIX: &str = "taskflow";
pub const DEFAULT_CACHE_VERSION: &str = "v1";

pub const STATIC_ASSETS: [&str; 7] = [
    "./",
    "./index.html",
    "./manifest.webmanifest",
    "./css/style.css",
    "./js/app.js",
    "./assets/icons/icon-192.png",
    "./assets/icons/icon-512.png",
];

pub fn cache_name(version: &str) -> String {
    format!("{CACHE_PREFIX}-{version}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(url: impl Into<String>, mode: RequestMode) -> Self {
        Self {
            url: url.into(),
            mode,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(url, RequestMode::Navigate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Named response caches keyed by request URL.
pub trait CacheStorage {
    fn put(&mut self, cache: &str, url: &str, response: Response) -> Result<(), AppError>;

    /// Looks the URL up across every cache, oldest cache first.
    fn match_url(&self, url: &str) -> Result<Option<Response>, AppError>;

    fn keys(&self) -> Result<Vec<String>, AppError>;

    fn delete(&mut self, cache: &str) -> Result<bool, AppError>;
}

pub trait Network {
    fn fetch(&self, request: &Request) -> Result<Response, AppError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStorage {
    caches: Vec<(String, BTreeMap<String, Response>)>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, cache: &str) -> Vec<String> {
        self.caches
            .iter()
            .find(|(name, _)| name == cache)
            .map(|(_, entries)| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn put(&mut self, cache: &str, url: &str, response: Response) -> Result<(), AppError> {
        match self.caches.iter_mut().find(|(name, _)| name == cache) {
            Some((_, entries)) => {
                entries.insert(url.to_string(), response);
            }
            None => {
                let entries = BTreeMap::from([(url.to_string(), response)]);
                self.caches.push((cache.to_string(), entries));
            }
        }
        Ok(())
    }

    fn match_url(&self, url: &str) -> Result<Option<Response>, AppError> {
        Ok(self
            .caches
            .iter()
            .find_map(|(_, entries)| entries.get(url).cloned()))
    }

    fn keys(&self) -> Result<Vec<String>, AppError> {
        Ok(self.caches.iter().map(|(name, _)| name.clone()).collect())
    }

    fn delete(&mut self, cache: &str) -> Result<bool, AppError> {
        let before = self.caches.len();
        self.caches.retain(|(name, _)| name != cache);
        Ok(self.caches.len() != before)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installed,
    Activated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub cached: usize,
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOutcome {
    pub deleted: Vec<String>,
    pub claimed_clients: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the caller goes to the network itself.
    Passthrough,
    Cached(Response),
    Network(Response),
}

#[derive(Debug)]
pub struct OfflineWorker<C, N> {
    scope: String,
    origin: String,
    cache_name: String,
    storage: C,
    network: N,
    state: WorkerState,
}

impl<C: CacheStorage, N: Network> OfflineWorker<C, N> {
    pub fn new(scope: &str, version: &str, storage: C, network: N) -> Result<Self, AppError> {
        let origin = origin_of(scope)
            .ok_or_else(|| AppError::invalid_input(format!("scope '{scope}' has no origin")))?;
        let mut scope = scope.to_string();
        if !scope.ends_with('/') {
            scope.push('/');
        }

        Ok(Self {
            scope,
            origin,
            cache_name: cache_name(version),
            storage,
            network,
            state: WorkerState::Parsed,
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn storage(&self) -> &C {
        &self.storage
    }

    pub fn resolve(&self, asset: &str) -> String {
        format!("{}{}", self.scope, asset.strip_prefix("./").unwrap_or(asset))
    }

    /// Pre-caches every static asset. Nothing is stored unless all succeed.
    #[tracing::instrument(skip(self), fields(cache = %self.cache_name))]
    pub fn install(&mut self) -> Result<InstallOutcome, AppError> {
        let mut fetched = Vec::with_capacity(STATIC_ASSETS.len());
        for asset in STATIC_ASSETS {
            let url = self.resolve(asset);
            let response = self.network.fetch(&Request::new(url.clone(), RequestMode::SameOrigin))?;
            if !response.ok() {
                return Err(AppError::io(format!(
                    "precache of {url} failed with status {}",
                    response.status
                )));
            }
            fetched.push((url, response));
        }

        let cached = fetched.len();
        for (url, response) in fetched {
            self.storage.put(&self.cache_name, &url, response)?;
        }
        self.state = WorkerState::Installed;
        tracing::info!(cached, "offline assets cached");

        Ok(InstallOutcome {
            cached,
            skip_waiting: true,
        })
    }

    /// Drops caches from other versions and takes control of open clients.
    #[tracing::instrument(skip(self), fields(cache = %self.cache_name))]
    pub fn activate(&mut self) -> Result<ActivateOutcome, AppError> {
        if self.state == WorkerState::Parsed {
            return Err(AppError::invalid_input("worker is not installed"));
        }

        let mut deleted = Vec::new();
        for name in self.storage.keys()? {
            if name != self.cache_name && self.storage.delete(&name)? {
                deleted.push(name);
            }
        }
        if !deleted.is_empty() {
            tracing::info!(?deleted, "removed stale caches");
        }
        self.state = WorkerState::Activated;

        Ok(ActivateOutcome {
            deleted,
            claimed_clients: true,
        })
    }

    pub fn handle_fetch(&mut self, request: &Request) -> Result<FetchOutcome, AppError> {
        let same_origin = self.is_same_origin(&request.url);
        if request.mode != RequestMode::Navigate && request.url.starts_with("http") && !same_origin
        {
            return Ok(FetchOutcome::Passthrough);
        }

        if let Some(cached) = self.storage.match_url(&request.url)? {
            return Ok(FetchOutcome::Cached(cached));
        }

        let response = self.network.fetch(request)?;
        if response.ok()
            && same_origin
            && let Err(err) = self
                .storage
                .put(&self.cache_name, &request.url, response.clone())
        {
            tracing::warn!(url = %request.url, error = %err, "could not cache response");
        }

        Ok(FetchOutcome::Network(response))
    }

    fn is_same_origin(&self, url: &str) -> bool {
        url.strip_prefix(&self.origin)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
    }
}

/// Installs and activates a worker. Failures are swallowed: the app keeps
/// working online without it.
pub fn register<C: CacheStorage, N: Network>(
    mut worker: OfflineWorker<C, N>,
) -> Option<OfflineWorker<C, N>> {
    match worker.install().and_then(|_| worker.activate()) {
        Ok(_) => Some(worker),
        Err(err) => {
            tracing::debug!(error = %err, "offline worker registration failed");
            None
        }
    }
}

fn origin_of(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if scheme.is_empty() || authority.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{authority}"))
}
