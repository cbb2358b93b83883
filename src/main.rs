//! # aitrade-context — Context Cycle
//!
//! Builds the model's decision context on a fixed interval.
//!
//! ## Flow
//! ```text
//! loop every N seconds:
//!   1. Load market snapshot (file or mock)
//!   2. Load the decision journal (read-only; the executor owns compaction)
//!   3. Resolve precision, group history, assemble the payload
//!   4. Render the prompt
//!   5. Write it to PAYLOAD_OUTPUT_PATH (or log it)
//! ```
//!
//! Environment variables are listed in `config.rs`. `RUST_LOG` overrides the
//! default `aitrade_context=debug` filter.

use std::path::Path;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aitrade_context::{
    build_payload, group_history, journal, market, prompt, Config, PrecisionTable,
};

/// What one cycle produced, for the log line.
struct CycleReport {
    symbols:    usize,
    timeframes: usize,
    decisions:  usize,
    bytes:      usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("aitrade_context=debug".parse()?))
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════╗
  ║   AITRADE CONTEXT — Decision Context      ║
  ║   Indicators · History · Payload          ║
  ╚═══════════════════════════════════════════╝"#);

    let config = Config::from_env().context("Failed to load config")?;

    info!(
        snapshot   = ?config.snapshot_path,
        journal    = %config.journal_path.display(),
        timeframes = ?config.timeframes,
        interval   = ?config.cycle_interval,
        "Context cycle started"
    );

    // ── Cycle Loop ────────────────────────────────────────────────────────────
    loop {
        match run_cycle(&config).await {
            Ok(report) => {
                info!(
                    symbols    = report.symbols,
                    timeframes = report.timeframes,
                    decisions  = report.decisions,
                    bytes      = report.bytes,
                    "✅ Context built"
                );
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "❌ Context cycle failed — will retry next interval");
            }
        }

        let Some(interval) = config.cycle_interval else {
            return Ok(());
        };
        info!(?interval, "💤 Sleeping until next cycle...");
        tokio::time::sleep(interval).await;
    }
}

/// One cycle: snapshot → journal → payload → prompt → output.
async fn run_cycle(config: &Config) -> anyhow::Result<CycleReport> {
    // 1. Market snapshot
    let snapshot = market::fetch_snapshot(config)
        .await
        .context("Failed to load market snapshot")?;

    // 2. Journal; a broken journal degrades to no history
    let records = match journal::load(&config.journal_path, config.max_history) {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Decision journal unreadable — continuing without history");
            Vec::new()
        }
    };

    // 3. Payload
    let assembler = config.assembler();
    let precision = PrecisionTable::from_filters(snapshot.filters(), config.precision);
    let history = group_history(&records, assembler.history_window);
    let now = chrono::Local::now().naive_local();
    let payload = build_payload(&snapshot, &history, &precision, &assembler, now);

    // 4. Render
    let text = if config.emit_prompt {
        prompt::build_prompt(&payload, &assembler)
    } else {
        payload.to_json_pretty()
    };

    // 5. Output
    match &config.output_path {
        Some(path) => write_output(path, &text).await?,
        None => info!("\n{text}"),
    }

    Ok(CycleReport {
        symbols:    payload.symbols.len(),
        timeframes: payload.symbols.iter().map(|s| s.market_data.len()).sum(),
        decisions:  records.len(),
        bytes:      text.len(),
    })
}

async fn write_output(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
