use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use hextech::config::{HextechConfig, ProviderKind};
use hextech::kernel::event::Command;
use hextech::kernel::state::Snapshot;
use hextech::runtime::{self, Driver};
use hextech::services::llm::{CannedProvider, HttpProvider, ResponseProvider};
use hextech::Reactor;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const HELP: &str = "commands: mode <1-5> | ctx <normal|dead|shop|objective> | say <text> | \
                    voice <on|off> | duplex | interrupt | suggest | snapshot | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = HextechConfig::resolve(config_arg()).context("loading configuration")?;
    tracing::info!(provider = ?config.provider.kind, "Hextech orchestrator booting...");

    let provider: Arc<dyn ResponseProvider> = match config.provider.kind {
        ProviderKind::Canned => Arc::new(CannedProvider::with_latency(config.provider.canned_latency_ms)),
        ProviderKind::Http => Arc::new(HttpProvider::new(&config.provider)),
    };

    let reactor = Reactor::new(config.timings.clone());
    let snapshots = reactor.subscribe();
    let (tx, rx) = mpsc::channel(100);
    let shutdown = CancellationToken::new();

    let driver = tokio::spawn(Driver::new(reactor, provider, rx, &config).run(shutdown.clone()));
    let printer = tokio::spawn(print_changes(snapshots.clone(), shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("reading stdin")?,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "suggest" => {
                for (i, query) in snapshots.borrow().suggestions.iter().enumerate() {
                    println!("  [{}] {}", i + 1, query);
                }
            }
            "snapshot" => {
                let json = serde_json::to_string_pretty(&*snapshots.borrow())?;
                println!("{json}");
            }
            other => match other.parse::<Command>() {
                Ok(command) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => println!("{e}. {HELP}"),
            },
        }
    }

    shutdown.cancel();
    let reactor = driver.await.context("driver task panicked")?;
    runtime::join_logged("printer", printer).await;
    tracing::info!(at = %reactor.now(), "Hextech orchestrator stopped");
    Ok(())
}

fn config_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Prints what changed between consecutive snapshots.
async fn print_changes(mut snapshots: watch::Receiver<Snapshot>, shutdown: CancellationToken) {
    let mut last = snapshots.borrow().clone();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
        let current = snapshots.borrow_and_update().clone();

        if current.mode != last.mode {
            println!("== {} ==", current.mode.label());
        }
        if current.game_context != last.game_context {
            println!("== 局势: {} ==", current.game_context.label());
        }
        let seen = last.logs.last().map(|entry| entry.id);
        for entry in current.logs.iter().filter(|entry| seen.map_or(true, |id| entry.id > id)) {
            println!("[{}] {:<11} {}", entry.timestamp, entry.role.tag(), entry.content);
        }
        for message in current.chat.iter().filter(|m| !last.chat.iter().any(|old| old.id == m.id)) {
            println!("<{}> {:?}: {}", message.timestamp.short_clock(), message.sender, message.text);
        }
        if current.ai != last.ai {
            let ai = &current.ai;
            let status = match (ai.is_thinking, ai.is_speaking, ai.is_listening) {
                (true, _, _) => "thinking".to_string(),
                (_, true, _) => format!("speaking: {}", ai.response.as_deref().unwrap_or_default()),
                (_, _, true) if ai.timer > 0 => format!("listening ({}s)", ai.timer),
                (_, _, true) => "listening".to_string(),
                _ => "idle".to_string(),
            };
            println!("   ai> {status}");
        }
        last = current;
    }
}
