//! K8s command - print an ExecCredential for kubectl.

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use clap::{ArgGroup, Args};
use jit_client::{K8sProbe, convert_k8s};
use jit_types::ExecCredential;

use super::{Context, emit, tenant_credentials};
use crate::session;

/// Arguments for the k8s command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").args(["plan", "tenant"])))]
pub struct K8sArgs {
    /// Get credentials for the given plan
    #[arg(long, value_name = "ID")]
    pub plan: Option<String>,

    /// Get credentials for the given tenant (name or id)
    #[arg(long, value_name = "NAME|ID")]
    pub tenant: Option<String>,
}

/// Run the k8s command.
pub async fn run(args: K8sArgs, ctx: &Context) -> Result<()> {
    let timeout = ctx.settings.request_timeout;
    let cache = ctx.cache();

    let creds = if let Some(plan) = args.plan.as_deref().filter(|p| !p.is_empty()) {
        let key = ctx.host_key().with("plan").with(plan);
        let probe = K8sProbe::for_plan(timeout)?;
        match cache.get::<ExecCredential>(&key, &probe).await {
            Some(creds) => creds,
            None => {
                let session = session::obtain(ctx, true).await?;
                let result = session
                    .client
                    .k8s()
                    .plan_jit_access(plan)
                    .await
                    .context("failed to get credentials")?;
                let creds = convert_k8s(&result, Utc::now())?;
                cache.put(&key, &creds);
                creds
            }
        }
    } else if let Some(id_or_name) = args.tenant.as_deref().filter(|t| !t.is_empty()) {
        tenant_credentials(
            ctx,
            id_or_name,
            |name| Ok(K8sProbe::for_tenant(name, timeout)?),
            |session, tenant| async move {
                let result = session
                    .client
                    .k8s()
                    .tenant_jit_access(&tenant.tenant_id)
                    .await?;
                Ok::<_, anyhow::Error>(convert_k8s(&result, Utc::now())?)
            },
        )
        .await?
    } else {
        bail!("invalid arguments: must specify --plan=ID or --tenant=NAME or --tenant=ID")
    };

    emit(&creds)
}
