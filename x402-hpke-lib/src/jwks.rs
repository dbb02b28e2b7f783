//! JWKS validation, caching, and key selection.
//!
//! The HTTP transport itself is injected through the [`JwksFetch`] trait so
//! integrators can bring their own client; this module owns everything else:
//! HTTPS enforcement, document validation, TTL derivation from response
//! headers, and kid-based key selection.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::keys::{jwk_to_public_bytes, Jwk};
use crate::{Result, X402Error};

/// A JSON Web Key Set document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Jwks {
    /// The published keys.
    pub keys: Vec<Jwk>,
}

/// Raw response from a JWKS endpoint, as produced by a [`JwksFetch`] impl.
#[derive(Clone, Debug)]
pub struct JwksResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Cache-Control` header value, if present.
    pub cache_control: Option<String>,
    /// `Expires` header value, if present.
    pub expires: Option<String>,
    /// Response body.
    pub body: String,
}

/// Transport seam for fetching JWKS documents.
#[async_trait]
pub trait JwksFetch {
    /// Perform an HTTP GET against `url` and return the raw response.
    async fn get(&self, url: &str) -> Result<JwksResponse>;
}

/// TTL clamping bounds for cached JWKS documents.
#[derive(Clone, Copy, Debug)]
pub struct JwksConfig {
    /// Lower TTL bound.
    pub min_ttl: Duration,
    /// Upper TTL bound.
    pub max_ttl: Duration,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            min_ttl: Duration::from_secs(60),
            max_ttl: Duration::from_secs(3600),
        }
    }
}

/// Fallback TTL when the response carries no usable cache headers.
const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Thread-safe in-process cache of validated JWKS documents.
#[derive(Debug, Default)]
pub struct JwksCache {
    entries: Mutex<HashMap<String, (Jwks, Instant)>>,
}

impl JwksCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached document for `url` if it has not expired.
    pub fn get(&self, url: &str) -> Option<Jwks> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(url)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(jwks, _)| jwks.clone())
    }

    /// Insert a document with the given TTL, replacing any prior entry.
    pub fn insert(&self, url: &str, jwks: Jwks, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_string(), (jwks, Instant::now() + ttl));
        }
    }
}

/// Fetch, validate, and cache a JWKS document.
///
/// HTTPS is mandatory. The TTL honors `Cache-Control: max-age`/`s-maxage`
/// and `Expires`, defaults to 300 seconds, and is clamped to
/// `[config.min_ttl, config.max_ttl]`.
pub async fn fetch_jwks<F: JwksFetch>(
    fetcher: &F,
    cache: &JwksCache,
    url: &str,
    config: &JwksConfig,
) -> Result<Jwks> {
    if url.is_empty() {
        return Err(X402Error::JwksUrlRequired);
    }
    if !url.starts_with("https://") {
        return Err(X402Error::JwksHttpsRequired);
    }
    if let Some(cached) = cache.get(url) {
        return Ok(cached);
    }

    let response = fetcher.get(url).await?;
    if response.status != 200 {
        return Err(X402Error::JwksHttp {
            status: response.status,
        });
    }

    let jwks: Jwks = serde_json::from_str(&response.body).map_err(|_| X402Error::JwksInvalid)?;
    validate_jwks(&jwks)?;

    let ttl = ttl_from_headers(response.cache_control.as_deref(), response.expires.as_deref())
        .unwrap_or(DEFAULT_TTL)
        .clamp(config.min_ttl, config.max_ttl);
    cache.insert(url, jwks.clone(), ttl);
    Ok(jwks)
}

/// Validate every key in a JWKS document.
pub fn validate_jwks(jwks: &Jwks) -> Result<()> {
    for key in &jwks.keys {
        if jwk_to_public_bytes(key).is_err() {
            return Err(X402Error::JwksKeyInvalid);
        }
        if let Some(use_) = &key.use_ {
            if use_ != "enc" {
                return Err(X402Error::JwksKeyUseInvalid);
            }
        }
        if key.kid.is_none() {
            return Err(X402Error::JwksKidInvalid);
        }
    }
    Ok(())
}

/// Select the key with the given `kid`, if any.
pub fn select_jwk<'a>(jwks: &'a Jwks, kid: &str) -> Option<&'a Jwk> {
    jwks.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
}

/// Derive a TTL from cache headers: `max-age`/`s-maxage` first, `Expires`
/// second.
fn ttl_from_headers(cache_control: Option<&str>, expires: Option<&str>) -> Option<Duration> {
    if let Some(cc) = cache_control {
        for directive in cc.split(',') {
            let directive = directive.trim().to_ascii_lowercase();
            for prefix in ["s-maxage=", "max-age="] {
                if let Some(raw) = directive.strip_prefix(prefix) {
                    if let Ok(secs) = raw.parse::<u64>() {
                        return Some(Duration::from_secs(secs));
                    }
                }
            }
        }
    }
    if let Some(expires) = expires {
        if let Ok(when) = chrono::DateTime::parse_from_rfc2822(expires) {
            let remaining = when.timestamp() - chrono::Utc::now().timestamp();
            return Some(Duration::from_secs(remaining.max(0) as u64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;

    struct StaticFetch {
        response: JwksResponse,
    }

    #[async_trait]
    impl JwksFetch for StaticFetch {
        async fn get(&self, _url: &str) -> Result<JwksResponse> {
            Ok(self.response.clone())
        }
    }

    fn sample_jwks() -> Jwks {
        let (public, _) = generate_keypair();
        Jwks {
            keys: vec![public.with_kid("kid1")],
        }
    }

    fn ok_response(jwks: &Jwks) -> JwksResponse {
        JwksResponse {
            status: 200,
            cache_control: None,
            expires: None,
            body: serde_json::to_string(jwks).unwrap(),
        }
    }

    #[tokio::test]
    async fn rejects_empty_and_non_https_urls() {
        let fetch = StaticFetch {
            response: ok_response(&sample_jwks()),
        };
        let cache = JwksCache::new();
        let config = JwksConfig::default();

        let err = fetch_jwks(&fetch, &cache, "", &config).await.unwrap_err();
        assert!(matches!(err, X402Error::JwksUrlRequired));

        let err = fetch_jwks(&fetch, &cache, "http://example.com/jwks", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, X402Error::JwksHttpsRequired));
    }

    #[tokio::test]
    async fn surfaces_http_status_failures() {
        let fetch = StaticFetch {
            response: JwksResponse {
                status: 404,
                cache_control: None,
                expires: None,
                body: String::new(),
            },
        };
        let err = fetch_jwks(
            &fetch,
            &JwksCache::new(),
            "https://example.com/jwks",
            &JwksConfig::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "JWKS_HTTP_404");
    }

    #[tokio::test]
    async fn fetches_validates_and_caches() {
        let jwks = sample_jwks();
        let fetch = StaticFetch {
            response: ok_response(&jwks),
        };
        let cache = JwksCache::new();

        let fetched = fetch_jwks(&fetch, &cache, "https://example.com/jwks", &JwksConfig::default())
            .await
            .unwrap();
        assert_eq!(fetched.keys.len(), 1);
        assert!(cache.get("https://example.com/jwks").is_some());
    }

    #[tokio::test]
    async fn malformed_documents_are_rejected() {
        let fetch = StaticFetch {
            response: JwksResponse {
                status: 200,
                cache_control: None,
                expires: None,
                body: "[1,2,3]".to_string(),
            },
        };
        let err = fetch_jwks(
            &fetch,
            &JwksCache::new(),
            "https://example.com/jwks",
            &JwksConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, X402Error::JwksInvalid));
    }

    #[test]
    fn validation_rejects_bad_keys() {
        let (public, _) = generate_keypair();

        let mut bad_curve = public.clone().with_kid("kid1");
        bad_curve.crv = "P-256".to_string();
        let err = validate_jwks(&Jwks {
            keys: vec![bad_curve],
        })
        .unwrap_err();
        assert!(matches!(err, X402Error::JwksKeyInvalid));

        let mut bad_use = public.clone().with_kid("kid1");
        bad_use.use_ = Some("sig".to_string());
        let err = validate_jwks(&Jwks { keys: vec![bad_use] }).unwrap_err();
        assert!(matches!(err, X402Error::JwksKeyUseInvalid));

        let err = validate_jwks(&Jwks {
            keys: vec![public.clone()],
        })
        .unwrap_err();
        assert!(matches!(err, X402Error::JwksKidInvalid));

        let mut enc_use = public.with_kid("kid1");
        enc_use.use_ = Some("enc".to_string());
        validate_jwks(&Jwks { keys: vec![enc_use] }).unwrap();
    }

    #[test]
    fn select_jwk_matches_kid_exactly() {
        let jwks = sample_jwks();
        assert!(select_jwk(&jwks, "kid1").is_some());
        assert!(select_jwk(&jwks, "kid2").is_none());
        assert!(select_jwk(&jwks, "KID1").is_none());
    }

    #[test]
    fn ttl_prefers_cache_control_over_expires() {
        let ttl = ttl_from_headers(Some("public, max-age=120"), None).unwrap();
        assert_eq!(ttl, Duration::from_secs(120));

        let ttl = ttl_from_headers(Some("s-maxage=90, max-age=120"), None).unwrap();
        assert_eq!(ttl, Duration::from_secs(90));

        assert!(ttl_from_headers(Some("no-store"), None).is_none());
        assert!(ttl_from_headers(None, None).is_none());
    }

    #[test]
    fn ttl_from_expires_never_goes_negative() {
        let past = "Mon, 01 Jan 2001 00:00:00 GMT";
        let ttl = ttl_from_headers(None, Some(past)).unwrap();
        assert_eq!(ttl, Duration::ZERO);
    }

    #[test]
    fn cache_expires_entries() {
        let cache = JwksCache::new();
        cache.insert("https://example.com/jwks", sample_jwks(), Duration::ZERO);
        assert!(cache.get("https://example.com/jwks").is_none());
    }
}
