//! Features API.

use crate::client::DuploClient;
use crate::error::Result;
use crate::types::SystemFeatures;

/// Features API client.
pub struct FeaturesApi {
    client: DuploClient,
}

impl FeaturesApi {
    pub(crate) fn new(client: DuploClient) -> Self {
        Self { client }
    }

    /// System-wide features. Doubles as an authenticated ping.
    pub async fn system(&self) -> Result<SystemFeatures> {
        self.client.get("v3/features/system").await
    }

    /// Features of one tenant.
    pub async fn tenant(&self, tenant_id: &str) -> Result<serde_json::Value> {
        self.client
            .get(&format!("v3/features/tenant/{}", tenant_id))
            .await
    }
}
