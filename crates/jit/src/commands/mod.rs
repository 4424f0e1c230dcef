//! CLI command handlers.

pub mod aws;
pub mod duplo;
pub mod k8s;

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use jit_cache::{CacheConfig, CachedCredential, CredentialCache, LivenessProbe};
use jit_client::api::looks_like_name;
use jit_client::{Error as ClientError, UserTenant};
use jit_config::Settings;
use jit_login::BrowserLauncher;
use jit_types::CacheKey;
use serde::Serialize;

use crate::session::{self, Session};

/// Shared context for all commands.
pub struct Context {
    /// Resolved settings.
    pub settings: Settings,
    /// Explicit token from `--token` / `DUPLO_TOKEN`.
    pub token: Option<String>,
    /// Cache location, fixed for the whole run.
    pub cache: CacheConfig,
    /// Opens the interactive login page.
    pub browser: Arc<dyn BrowserLauncher>,
}

impl Context {
    pub fn cache(&self) -> CredentialCache<'_> {
        CredentialCache::new(&self.cache)
    }

    /// Cache key for the broker itself.
    pub fn host_key(&self) -> CacheKey {
        CacheKey::new(&self.settings.host)
    }

    /// Cache key for one tenant's credentials.
    pub fn tenant_key(&self, tenant_name: &str) -> CacheKey {
        self.host_key().with("tenant").with(tenant_name)
    }
}

/// Resolve `--tenant` (name or id) against the tenants the user may see.
pub async fn resolve_tenant(session: &Session, id_or_name: &str) -> Result<UserTenant> {
    match session.client.tenants().resolve(id_or_name).await {
        Ok(tenant) => Ok(tenant),
        Err(e @ ClientError::NotFound(_)) => Err(e.into()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("tenant '{}' missing or not allowed", id_or_name))),
    }
}

/// Cached or freshly fetched credentials for one tenant.
///
/// A tenant name is enough to find the cache entry without a broker session.
/// An id only yields its cache key once resolved, so that lookup happens
/// after resolution. `probe_for` gets the tenant name.
pub async fn tenant_credentials<C, P, F, Fut>(
    ctx: &Context,
    id_or_name: &str,
    probe_for: impl Fn(&str) -> Result<P>,
    fetch: F,
) -> Result<C>
where
    C: CachedCredential,
    P: LivenessProbe<C>,
    F: FnOnce(Session, UserTenant) -> Fut,
    Fut: Future<Output = Result<C>>,
{
    let cache = ctx.cache();
    let by_name = looks_like_name(id_or_name);

    if by_name {
        let probe = probe_for(id_or_name)?;
        if let Some(creds) = cache.get::<C>(&ctx.tenant_key(id_or_name), &probe).await {
            return Ok(creds);
        }
    }

    let session = session::obtain(ctx, false).await?;
    let tenant = resolve_tenant(&session, id_or_name).await?;
    let key = ctx.tenant_key(&tenant.account_name);

    if !by_name {
        let probe = probe_for(&tenant.account_name)?;
        if let Some(creds) = cache.get::<C>(&key, &probe).await {
            return Ok(creds);
        }
    }

    let creds = fetch(session, tenant)
        .await
        .context("failed to get credentials")?;
    cache.put(&key, &creds);
    Ok(creds)
}

/// Write one compact JSON document and a newline.
pub fn write_document<W: Write, T: Serialize>(mut out: W, doc: &T) -> Result<()> {
    let json = serde_json::to_string(doc).context("cannot marshal to JSON")?;
    writeln!(out, "{}", json)?;
    out.flush()?;
    Ok(())
}

/// Print the credential document. This is the only thing written to stdout.
pub fn emit<T: Serialize>(doc: &T) -> Result<()> {
    write_document(std::io::stdout().lock(), doc)
}
