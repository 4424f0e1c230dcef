//! Tenants API.

use crate::client::DuploClient;
use crate::error::{Error, Result};
use crate::types::UserTenant;

/// Tenant ids are UUIDs; anything shorter is taken to be a tenant name.
pub const TENANT_ID_LEN: usize = 32;

/// Tenants API client.
pub struct TenantsApi {
    client: DuploClient,
}

impl TenantsApi {
    pub(crate) fn new(client: DuploClient) -> Self {
        Self { client }
    }

    /// List the tenants visible to the current user.
    pub async fn list_for_user(&self) -> Result<Vec<UserTenant>> {
        self.client.get("admin/GetTenantsForUser").await
    }

    /// Find a tenant by name.
    pub async fn by_name(&self, name: &str) -> Result<Option<UserTenant>> {
        let tenants = self.list_for_user().await?;
        Ok(tenants.into_iter().find(|t| t.account_name == name))
    }

    /// Find a tenant by id.
    pub async fn by_id(&self, tenant_id: &str) -> Result<Option<UserTenant>> {
        let tenants = self.list_for_user().await?;
        Ok(tenants.into_iter().find(|t| t.tenant_id == tenant_id))
    }

    /// Resolve a tenant given either its name or its id.
    pub async fn resolve(&self, id_or_name: &str) -> Result<UserTenant> {
        let tenant = if looks_like_name(id_or_name) {
            self.by_name(id_or_name).await?
        } else {
            self.by_id(id_or_name).await?
        };
        tenant.ok_or_else(|| Error::NotFound(format!("tenant '{}' missing or not allowed", id_or_name)))
    }
}

/// Whether a `--tenant` argument is a name rather than an id.
pub fn looks_like_name(id_or_name: &str) -> bool {
    id_or_name.len() < TENANT_ID_LEN
}
