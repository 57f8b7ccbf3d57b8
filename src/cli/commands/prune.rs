use crate::config::Config;
use crate::db::Store;
use crate::services::scheduler::run_cleanup;

pub async fn cmd_prune(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_url).await?;
    let report = run_cleanup(&store, config.scheduler.rate_limit_retention_minutes).await?;

    println!(
        "Removed {} expired cache entries and {} rate-limit windows.",
        report.cache_entries, report.rate_limit_windows
    );
    Ok(())
}
