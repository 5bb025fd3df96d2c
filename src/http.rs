use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "match_forest";
const CACHE_FILE: &str = "http_cache.json";

static CLIENT: OnceCell<Client> = OnceCell::new();
static CACHE: Mutex<Option<BodyCache>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BodyCache {
    version: u32,
    entries: HashMap<String, CachedBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedBody {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: i64,
}

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("match_forest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")
    })
}

pub fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}"));
    }
    Ok(body)
}

/// GET with ETag / Last-Modified revalidation against the on-disk body cache.
/// A 304 answer serves the cached body.
pub fn fetch_text_cached(client: &Client, url: &str) -> Result<String> {
    let cached = with_cache(|cache| cache.entries.get(url).cloned());

    let mut req = client.get(url);
    if let Some(entry) = cached.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        let Some(entry) = cached else {
            return Err(anyhow!("received 304 without a cached body for {url}"));
        };
        log::debug!("dataset not modified since {}", entry.fetched_at);
        return Ok(entry.body);
    }

    let header = |name: HeaderName| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let etag = header(ETAG);
    let last_modified = header(LAST_MODIFIED);
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}"));
    }

    let entry = CachedBody {
        body: body.clone(),
        etag,
        last_modified,
        fetched_at: Utc::now().timestamp(),
    };
    with_cache(|cache| {
        cache.version = CACHE_VERSION;
        cache.entries.insert(url.to_string(), entry);
        if let Err(err) = save_cache(cache) {
            log::warn!("could not persist http cache: {err:#}");
        }
    });
    Ok(body)
}

fn with_cache<T>(f: impl FnOnce(&mut BodyCache) -> T) -> T {
    let mut guard = CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let cache = guard.get_or_insert_with(load_cache);
    f(cache)
}

fn load_cache() -> BodyCache {
    let Some(raw) = cache_path().and_then(|p| fs::read_to_string(p).ok()) else {
        return BodyCache::default();
    };
    let cache = serde_json::from_str::<BodyCache>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return BodyCache::default();
    }
    cache
}

fn save_cache(cache: &BodyCache) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}
