//! Command-line interface for the stockdash client
//!
//! Two subcommands exercise the orchestration layer: `analyze` streams
//! one multi-agent analysis run to the terminal, `indicators` loads
//! the merged indicator set for a subject and prints a summary table.

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use stockdash_client::{
    ApiClient, ClientConfig, FetchOrchestrator, LoadOutcome, SessionState, SessionStep,
    TaskSession, WsTransportFactory,
};
use stockdash_models::{IndicatorSeries, Period, Subject};

#[derive(Parser, Debug)]
#[command(name = "stockdash")]
#[command(about = "Client for the stock analysis dashboard", long_about = None)]
struct Args {
    /// REST API base URL
    #[arg(long, default_value = "http://localhost:8000")]
    api_base: String,

    /// Streaming channel base URL
    #[arg(long, default_value = "ws://localhost:8000")]
    ws_base: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a multi-agent analysis and stream agent messages
    Analyze {
        /// Stock code, e.g. 600519
        code: String,

        /// Analysis type sent on task creation
        #[arg(long, default_value = "comprehensive")]
        analysis_type: String,
    },
    /// Load the merged indicator set for a subject
    Indicators {
        /// Stock code, e.g. 600519
        code: String,

        /// K-line period: daily, weekly, or monthly
        #[arg(long, default_value = "daily")]
        period: Period,
    },
}

/// Initialize tracing subscriber with default configuration
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = ClientConfig::new(args.api_base, args.ws_base);

    match args.command {
        Command::Analyze {
            code,
            analysis_type,
        } => analyze(config, &code, analysis_type).await,
        Command::Indicators { code, period } => indicators(config, &code, period).await,
    }
}

async fn analyze(config: ClientConfig, code: &str, analysis_type: String) -> anyhow::Result<()> {
    let ws_base = config.ws_base.clone();
    let api = Arc::new(ApiClient::new(config).context("building API client")?);
    let transports = Arc::new(WsTransportFactory::new(ws_base));
    let mut session = TaskSession::new(api, transports, analysis_type);

    session
        .start(code)
        .await
        .with_context(|| format!("starting analysis for {code}"))?;
    info!(task_id = %session.view().task.id, "analysis task created");

    let mut printed = 0;
    loop {
        let step = session.step().await;
        for message in &session.view().messages[printed..] {
            println!("[{}] {}", message.role.display_name(), message.content);
        }
        printed = session.view().messages.len();
        match step {
            SessionStep::Applied => {}
            SessionStep::Terminal | SessionStep::Closed => break,
        }
    }

    let view = session.view();
    match session.state() {
        SessionState::Completed => {
            let report = view.report.as_ref().context("completed without report")?;
            println!();
            println!("== Analysis report: {} ({}) ==", report.stock_name, report.stock_code);
            if let Some(summary) = &report.research_summary {
                println!("Summary: {summary}");
            }
            if let Some(decision) = &report.trading_decision {
                println!("Decision: {decision}");
            }
            if let Some(risk) = &report.risk_assessment {
                println!("Risk: {risk}");
            }
            if let Some(recommendation) = &report.recommendation {
                println!("Recommendation: {recommendation}");
            }
            if let Some(target) = report.target_price {
                println!("Target price: {target}");
            }
            if let Some(stop) = report.stop_loss {
                println!("Stop loss: {stop}");
            }
            Ok(())
        }
        SessionState::Failed => {
            anyhow::bail!("analysis failed: {:?}", view.failure)
        }
        state => {
            anyhow::bail!("channel closed while {state:?}, progress {}", view.task.progress)
        }
    }
}

async fn indicators(config: ClientConfig, code: &str, period: Period) -> anyhow::Result<()> {
    let api = Arc::new(ApiClient::new(config).context("building API client")?);
    let orchestrator = FetchOrchestrator::new(api);
    let subject = Subject::new(code, period);

    let outcome = orchestrator
        .load(&subject)
        .await
        .with_context(|| format!("loading indicators for {subject}"))?;
    let set = match outcome {
        LoadOutcome::Loaded(set) => set,
        LoadOutcome::Superseded => anyhow::bail!("load superseded"),
    };

    println!("{} bars for {}", set.len(), set.subject);

    let mut table = Table::new();
    table.set_header(["indicator", "line", "points", "non-null", "latest"]);
    for (indicator, series) in &set.indicators {
        for (line, values) in lines(series) {
            let non_null = values.iter().filter(|v| v.is_some()).count();
            let latest = values
                .iter()
                .rev()
                .find_map(|v| *v)
                .map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
            table.add_row([
                indicator.as_str().to_string(),
                line.to_string(),
                values.len().to_string(),
                non_null.to_string(),
                latest,
            ]);
        }
    }
    println!("{table}");
    Ok(())
}

/// Named lines of a series, in display order.
fn lines(series: &IndicatorSeries) -> Vec<(&'static str, &Vec<Option<f64>>)> {
    match series {
        IndicatorSeries::Values { values } => vec![("values", values)],
        IndicatorSeries::Macd {
            macd,
            signal,
            histogram,
        } => vec![("macd", macd), ("signal", signal), ("histogram", histogram)],
        IndicatorSeries::Kdj { k, d, j } => vec![("k", k), ("d", d), ("j", j)],
        IndicatorSeries::Boll {
            upper,
            middle,
            lower,
        } => vec![("upper", upper), ("middle", middle), ("lower", lower)],
    }
}
