use std::collections::HashMap;
use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 2;
const CACHE_DIR: &str = "matchsight";
const CACHE_FILE: &str = "http_cache.json";

static STORE: Mutex<Option<CacheStore>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheStore {
    version: u32,
    entries: HashMap<String, StoredResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredResponse {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// GET through the on-disk cache.
///
/// A body younger than `max_age` is served without touching the network;
/// an older one is revalidated with its ETag/Last-Modified validators.
/// The season CSV rarely changes and gets a long window, while fixture
/// lists pass `Duration::ZERO` to revalidate every time.
///
/// `extra_headers` (the API key among them) are folded into the cache
/// key, so responses fetched under different keys never shadow each
/// other and the key itself is not written to disk.
pub fn fetch_cached(
    client: &Client,
    url: &str,
    extra_headers: &[(&str, &str)],
    max_age: Duration,
) -> Result<String> {
    let key = cache_key(url, extra_headers);
    let cached = lookup(&key);

    if let Some(entry) = cached.as_ref()
        && is_fresh(entry.fetched_at, max_age, now_secs())
    {
        return Ok(entry.body.clone());
    }

    let mut req = client.get(url);
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    if let Some(entry) = cached.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();

    if status == StatusCode::NOT_MODIFIED {
        let Some(mut entry) = cached else {
            return Err(anyhow!("received 304 without a cached body"));
        };
        entry.fetched_at = now_secs();
        let body = entry.body.clone();
        store(&key, entry);
        return Ok(body);
    }

    let etag = header_string(&resp, ETAG);
    let last_modified = header_string(&resp, LAST_MODIFIED);
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, body));
    }

    store(
        &key,
        StoredResponse {
            body: body.clone(),
            etag,
            last_modified,
            fetched_at: now_secs(),
        },
    );
    Ok(body)
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

/// URL plus a fingerprint of the request headers. Keyed endpoints get one
/// entry per key without the key appearing in the cache file.
fn cache_key(url: &str, extra_headers: &[(&str, &str)]) -> String {
    if extra_headers.is_empty() {
        return url.to_string();
    }
    let mut hasher = DefaultHasher::new();
    for (name, value) in extra_headers {
        name.hash(&mut hasher);
        value.hash(&mut hasher);
    }
    format!("{url}#{:016x}", hasher.finish())
}

fn is_fresh(fetched_at: u64, max_age: Duration, now: u64) -> bool {
    if max_age.is_zero() {
        return false;
    }
    now.saturating_sub(fetched_at) < max_age.as_secs()
}

fn header_string(resp: &reqwest::blocking::Response, name: reqwest::header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn lookup(key: &str) -> Option<StoredResponse> {
    let mut guard = STORE.lock().expect("http cache lock poisoned");
    let store = guard.get_or_insert_with(load_store);
    store.entries.get(key).cloned()
}

fn store(key: &str, entry: StoredResponse) {
    let mut guard = STORE.lock().expect("http cache lock poisoned");
    let store = guard.get_or_insert_with(load_store);
    store.version = CACHE_VERSION;
    store.entries.insert(key.to_string(), entry);
    let _ = persist(store);
}

fn load_store() -> CacheStore {
    let Some(path) = cache_path() else {
        return CacheStore::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return CacheStore::default();
    };
    let store = serde_json::from_str::<CacheStore>(&raw).unwrap_or_default();
    if store.version != CACHE_VERSION {
        return CacheStore::default();
    }
    store
}

fn persist(store: &CacheStore) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(store).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unkeyed_requests_cache_by_url_alone() {
        let url = "https://example.com/season.csv";
        assert_eq!(cache_key(url, &[]), url);
    }

    #[test]
    fn different_api_keys_get_different_cache_entries() {
        let url = "https://v3.football.api-sports.io/fixtures?league=39";
        let a = cache_key(url, &[("x-apisports-key", "key-a")]);
        let b = cache_key(url, &[("x-apisports-key", "key-b")]);
        assert_ne!(a, b);
        assert_eq!(a, cache_key(url, &[("x-apisports-key", "key-a")]));
    }

    #[test]
    fn keyed_cache_entries_do_not_contain_the_key() {
        let key = cache_key("https://example.com", &[("x-apisports-key", "secret-token")]);
        assert!(!key.contains("secret-token"));
    }

    #[test]
    fn zero_max_age_always_revalidates() {
        let now = now_secs();
        assert!(!is_fresh(now, Duration::ZERO, now));
        assert!(is_fresh(now, Duration::from_secs(60), now));
        assert!(!is_fresh(now - 61, Duration::from_secs(60), now));
    }
}
