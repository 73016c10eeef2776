//! `fleetctl quota` — agents available to a user.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;

/// Arguments for the quota command.
#[derive(Args)]
pub struct QuotaArgs {
    /// User to report for
    pub user: String,
    /// Only report this region
    #[arg(long)]
    pub region: Option<String>,
}

/// Run the quota command.
///
/// # Errors
///
/// Returns `AccessError` if the user is unknown or may not use the region.
pub async fn run(app: &AppContext, args: &QuotaArgs) -> Result<()> {
    match &args.region {
        Some(region) => {
            let count = app.registry.available_count(&args.user, region).await?;
            app.renderer()
                .render_region_quota(&args.user, region, count)
        }
        None => {
            let counts = app.registry.available_count_by_region(&args.user).await?;
            app.renderer().render_quota(&args.user, &counts)
        }
    }
}
