//! Broker API endpoints, grouped by area.

mod aws;
mod features;
mod k8s;
mod tenants;

pub use aws::AwsApi;
pub use features::FeaturesApi;
pub use k8s::K8sApi;
pub use tenants::{TENANT_ID_LEN, TenantsApi, looks_like_name};
