//! Duplo command - print a broker session token.

use anyhow::Result;

use super::{Context, emit};
use crate::session;

/// Run the duplo command.
pub async fn run(ctx: &Context) -> Result<()> {
    let session = session::obtain(ctx, true).await?;
    emit(&session.creds)
}
