//! AWS command - print credentials in `credential_process` format.

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use clap::{ArgGroup, Args};
use jit_client::{StsProbe, convert_aws};
use jit_types::AwsConfigOutput;

use super::{Context, emit, tenant_credentials};
use crate::session;

/// Arguments for the aws command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").args(["admin", "duplo_ops", "tenant"])))]
pub struct AwsArgs {
    /// Get admin credentials
    #[arg(long)]
    pub admin: bool,

    /// Get Duplo operations credentials
    #[arg(long)]
    pub duplo_ops: bool,

    /// Get credentials for the given tenant (name or id)
    #[arg(long, value_name = "NAME|ID")]
    pub tenant: Option<String>,
}

enum Target {
    /// An admin role: `admin` or `duplo-ops`.
    Role(&'static str),
    Tenant(String),
}

impl AwsArgs {
    fn target(&self) -> Result<Target> {
        if self.admin {
            Ok(Target::Role("admin"))
        } else if self.duplo_ops {
            Ok(Target::Role("duplo-ops"))
        } else if let Some(tenant) = self.tenant.as_deref().filter(|t| !t.is_empty()) {
            Ok(Target::Tenant(tenant.to_string()))
        } else {
            bail!("invalid arguments: must specify --admin or --tenant=NAME or --tenant=ID")
        }
    }
}

/// Run the aws command.
pub async fn run(args: AwsArgs, ctx: &Context) -> Result<()> {
    let target = args.target()?;
    let timeout = ctx.settings.request_timeout;

    let creds = match target {
        Target::Role(role) => {
            let cache = ctx.cache();
            let probe = StsProbe::new(timeout)?;
            let key = ctx.host_key().with(role);
            match cache.get::<AwsConfigOutput>(&key, &probe).await {
                Some(creds) => creds,
                None => {
                    let session = session::obtain(ctx, true).await?;
                    let aws = session.client.aws();
                    let result = match role {
                        "admin" => aws.admin_credentials().await,
                        _ => aws.admin_jit_access(role).await,
                    };
                    let result = result.context("failed to get credentials")?;
                    let creds = convert_aws(&result, Utc::now());
                    cache.put(&key, &creds);
                    creds
                }
            }
        }
        Target::Tenant(id_or_name) => {
            tenant_credentials(
                ctx,
                &id_or_name,
                |_| Ok(StsProbe::new(timeout)?),
                |session, tenant| async move {
                    let result = session
                        .client
                        .aws()
                        .tenant_credentials(&tenant.tenant_id)
                        .await?;
                    Ok::<_, anyhow::Error>(convert_aws(&result, Utc::now()))
                },
            )
            .await?
        }
    };

    emit(&creds)
}
