//! `fleetctl reconcile [--watch]` — probe every agent and persist liveness.

use anyhow::Result;
use clap::Args;
use tracing::warn;

use crate::app::AppContext;

/// Arguments for the reconcile command.
#[derive(Args)]
pub struct ReconcileArgs {
    /// Keep reconciling on the configured interval until interrupted
    #[arg(long)]
    pub watch: bool,
}

/// Run the reconcile command.
///
/// # Errors
///
/// Returns an error if the agent listing fails on a one-shot pass.
pub async fn run(app: &AppContext, args: &ReconcileArgs) -> Result<()> {
    if !args.watch {
        let report = app.registry.reconcile_now().await?;
        return app.renderer().render_reconcile(&report);
    }

    let interval = app.config.reconcile.interval();
    app.output.info(&format!(
        "Reconciling every {}s (Ctrl-C to stop)",
        interval.as_secs()
    ));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let passes = app.registry.run_reconciler(interval, shutdown).await?;
    app.output.success(&format!("Stopped after {passes} pass(es)"));
    Ok(())
}
