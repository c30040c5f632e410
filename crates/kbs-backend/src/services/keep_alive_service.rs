use std::time::Duration;

use kbs_supabase::RestClient;

use super::AppContextHandle;

async fn ping(rest: &RestClient, table: &str) {
    match rest.keep_alive(table).await {
        Ok(()) => log::info!("Keep-alive query on {table} succeeded"),
        Err(error) => log::warn!("Keep-alive query on {table} failed: {error}"),
    }
}

/// Pings the table at startup and then every configured interval so the
/// hosted database is not paused for inactivity.
pub async fn run_keep_alive(context: AppContextHandle) {
    let (rest, table, interval) = {
        let state = context.state.read().await;
        (
            state.rest.clone(),
            state.config.backend.table.clone(),
            state.config.backend.keep_alive_interval_secs,
        )
    };
    let Some(rest) = rest else {
        return;
    };

    ping(&rest, &table).await;
    let Some(secs) = interval.filter(|secs| *secs > 0) else {
        return;
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    // the first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        ping(&rest, &table).await;
    }
}
