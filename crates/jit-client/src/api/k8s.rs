//! Kubernetes JIT API.

use crate::client::DuploClient;
use crate::error::Result;
use crate::types::K8sJitConfig;

/// Kubernetes JIT API client.
pub struct K8sApi {
    client: DuploClient,
}

impl K8sApi {
    pub(crate) fn new(client: DuploClient) -> Self {
        Self { client }
    }

    /// Cluster access for a whole plan (admin only).
    pub async fn plan_jit_access(&self, plan_id: &str) -> Result<K8sJitConfig> {
        self.client
            .get(&format!("v3/admin/plans/{}/k8sConfig", plan_id))
            .await
    }

    /// Cluster access scoped to one tenant's namespace.
    pub async fn tenant_jit_access(&self, tenant_id: &str) -> Result<K8sJitConfig> {
        self.client
            .get(&format!("v3/subscriptions/{}/k8sConfig", tenant_id))
            .await
    }
}
