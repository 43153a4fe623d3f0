use super::AppContext;
use crate::backup::{format_size, BackupReport, BatchSummary};
use anyhow::Result;

pub fn execute(name: &str, ctx: &AppContext) -> Result<()> {
    println!("Backing up server '{}'...", name);

    let report = ctx.orchestrator()?.run(name)?;
    print_report(&report);

    Ok(())
}

/// Back up every server. Per-server failures are reported, not returned.
pub fn execute_all(ctx: &AppContext) -> Result<BatchSummary> {
    let summary = ctx.orchestrator()?.run_all()?;

    for report in &summary.succeeded {
        print_report(report);
    }
    for (name, error) in &summary.failed {
        println!("✗ {}: {}", name, error);
    }
    println!(
        "\n{} succeeded, {} failed",
        summary.succeeded.len(),
        summary.failed.len()
    );

    Ok(summary)
}

fn print_report(report: &BackupReport) {
    println!("✓ Backup of '{}' completed", report.server);
    println!("  Archive: {}", report.archive.display());
    println!("  Size: {}", format_size(report.size_bytes));
    println!("  SHA-256: {}", report.sha256);
    if report.pruned > 0 {
        println!("  Removed {} expired archive(s)", report.pruned);
    }
    if report.prune_failures > 0 {
        println!(
            "  Warning: {} expired archive(s) could not be removed",
            report.prune_failures
        );
    }
    if !report.notified {
        println!("  Warning: archive was not delivered to Telegram (see log)");
    }
}
