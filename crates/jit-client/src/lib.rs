//! Duplo broker client for duplo-jit.
//!
//! - [`DuploClient`]: typed access to the broker endpoints that issue
//!   just-in-time credentials
//! - [`convert`]: broker responses to the documents written to stdout and cache
//! - [`probe`]: [`jit_cache::LivenessProbe`] implementations for each credential kind
//!
//! # Example
//!
//! ```no_run
//! use jit_client::{DuploClient, Result, convert_aws};
//!
//! # async fn example() -> Result<()> {
//! let client = DuploClient::builder()
//!     .base_url("https://example.duplocloud.net")
//!     .token("secret")
//!     .build()?;
//!
//! let tenant = client.tenants().resolve("dev01").await?;
//! let creds = client.aws().tenant_credentials(&tenant.tenant_id).await?;
//! let output = convert_aws(&creds, chrono::Utc::now());
//! println!("{}", output.expiration);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod convert;
pub mod error;
pub mod probe;
pub mod types;

pub use client::{ClientBuilder, DEFAULT_TIMEOUT, DuploClient};
pub use convert::{convert_aws, convert_k8s};
pub use error::{Error, Result};
pub use probe::{DuploProbe, K8sProbe, StsProbe};
pub use types::*;
