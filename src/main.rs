use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use coverage_sync::{
    fetch::{parse_api_base, BitableClient, TokenCache},
    history::{spawn_recorder, ScheduleStore},
    notify::{build_card, Messenger, Recipient},
    report::summarize,
    sync::run_sync,
    SyncConfig,
};
use reqwest::Client;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,coverage_sync=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = SyncConfig::parse();
    let opts = cfg.sync_options();
    info!(
        csv = %cfg.csv_path.display(),
        table = %cfg.table_id,
        batch_size = opts.batch_size,
        page_size = opts.page_size,
        "configured"
    );

    // ─── 3) remote clients ───────────────────────────────────────────
    let http = Client::builder()
        .build()
        .context("building http client")?;
    let api_base = parse_api_base(&cfg.api_base)?;
    let auth = Arc::new(TokenCache::new(
        http.clone(),
        &api_base,
        &cfg.app_id,
        &cfg.app_secret,
    )?);
    let table = BitableClient::new(
        http.clone(),
        Arc::clone(&auth),
        &api_base,
        &cfg.app_token,
        &cfg.table_id,
        cfg.request_timeout(),
    )?;

    let (events, recorder) = spawn_recorder(ScheduleStore::new(&cfg.schedule_state));

    // ─── 4) sync ─────────────────────────────────────────────────────
    let start = Instant::now();
    let stats = run_sync(&table, &cfg.csv_path, &opts).await?;
    let summary = summarize(&stats, start.elapsed());
    info!(
        success_rate = format!("{:.1}%", summary.success_rate),
        elapsed = ?start.elapsed(),
        outcome = ?summary.outcome,
        "run complete"
    );

    // ─── 5) notify ───────────────────────────────────────────────────
    let recipients: Vec<Recipient> = cfg
        .chat_id
        .iter()
        .map(|id| Recipient::Chat(id.clone()))
        .chain(cfg.email.iter().map(|e| Recipient::Email(e.clone())))
        .collect();
    if recipients.is_empty() {
        info!("no recipients configured, skipping card");
    } else {
        match Messenger::new(http, auth, &api_base) {
            Ok(messenger) => {
                let card = build_card(&summary, Local::now(), cfg.table_url.as_deref());
                let sent = messenger.broadcast(&recipients, &card).await;
                info!(sent, of = recipients.len(), "cards delivered");
            }
            Err(e) => error!(error = %format!("{:#}", e), "messenger unavailable"),
        }
    }

    // ─── 6) count the run ────────────────────────────────────────────
    events.attempted();
    drop(events);
    let _ = recorder.await;

    info!("all done");
    Ok(())
}
