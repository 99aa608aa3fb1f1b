//! Domain-keyed result cache.
//!
//! One row per domain in `domain_cache`; a row is live while
//! `ttl_at > now`. There is no background eviction: expired rows are
//! ignored on read and overwritten by the next successful scan.

use log::warn;
use sqlx::{Pool, Row, Sqlite};

use crate::error_handling::DatabaseError;
use crate::models::{RedirectStep, ScanResult};

/// A cached scan result as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Canonical hostname the row is keyed by.
    pub domain: String,
    /// Related domains from the cached scan.
    pub related_domains: Vec<String>,
    /// Final URL from the cached scan.
    pub final_url: String,
    /// Redirect chain from the cached scan.
    pub redirect_chain: Vec<RedirectStep>,
    /// Unix seconds the row was written.
    pub updated_at: i64,
    /// Unix seconds the row expires.
    pub ttl_at: i64,
}

/// Creates the cache table. Safe to run on every boot.
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<(), DatabaseError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS domain_cache (
            domain TEXT PRIMARY KEY,
            result_json TEXT NOT NULL,
            final_url TEXT NOT NULL,
            redirect_chain_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            ttl_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns the live cache entry for `domain`, if any.
///
/// Expired rows and rows whose JSON blobs no longer parse are treated as
/// a miss; the latter are logged since they indicate a schema drift or a
/// torn write.
pub async fn lookup(
    pool: &Pool<Sqlite>,
    domain: &str,
    now: i64,
) -> Result<Option<CacheEntry>, DatabaseError> {
    let row = sqlx::query(
        "SELECT domain, result_json, final_url, redirect_chain_json, updated_at, ttl_at
         FROM domain_cache WHERE domain = ? AND ttl_at > ?",
    )
    .bind(domain)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let result_json: String = row.try_get("result_json")?;
    let redirect_chain_json: String = row.try_get("redirect_chain_json")?;

    let related_domains: Vec<String> = match serde_json::from_str(&result_json) {
        Ok(v) => v,
        Err(e) => {
            warn!("Discarding cache row for {domain}: bad result_json ({e})");
            return Ok(None);
        }
    };
    let redirect_chain: Vec<RedirectStep> = match serde_json::from_str(&redirect_chain_json) {
        Ok(v) => v,
        Err(e) => {
            warn!("Discarding cache row for {domain}: bad redirect_chain_json ({e})");
            return Ok(None);
        }
    };

    Ok(Some(CacheEntry {
        domain: row.try_get("domain")?,
        related_domains,
        final_url: row.try_get("final_url")?,
        redirect_chain,
        updated_at: row.try_get("updated_at")?,
        ttl_at: row.try_get("ttl_at")?,
    }))
}

/// Writes (or replaces) the row for `domain`.
///
/// Sets `updated_at = now` and `ttl_at = now + ttl_seconds`. A single
/// statement, so concurrent scans of the same domain simply last-write-win
/// under SQLite's own locking.
pub async fn upsert(
    pool: &Pool<Sqlite>,
    domain: &str,
    result: &ScanResult,
    now: i64,
    ttl_seconds: i64,
) -> Result<(), DatabaseError> {
    let result_json =
        serde_json::to_string(&result.related_domains).unwrap_or_else(|_| "[]".into());
    let redirect_chain_json =
        serde_json::to_string(&result.redirect_chain).unwrap_or_else(|_| "[]".into());

    sqlx::query(
        "INSERT INTO domain_cache
            (domain, result_json, final_url, redirect_chain_json, updated_at, ttl_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(domain) DO UPDATE SET
            result_json = excluded.result_json,
            final_url = excluded.final_url,
            redirect_chain_json = excluded.redirect_chain_json,
            updated_at = excluded.updated_at,
            ttl_at = excluded.ttl_at",
    )
    .bind(domain)
    .bind(result_json)
    .bind(&result.final_url)
    .bind(redirect_chain_json)
    .bind(now)
    .bind(now + ttl_seconds)
    .execute(pool)
    .await?;

    Ok(())
}
