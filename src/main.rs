mod config;
mod data;
mod utils;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::data::abi::AbiRegistry;
use crate::data::export::{TokenContext, export_records_csv, report_path};
use crate::data::provider::HttpTransport;
use crate::data::router::validate_schemas;
use crate::data::tokens::TokenList;
use crate::data::{Pipeline, category_counts, filter_by_sender, group_by_block, group_by_sender, select};
use crate::utils::to_bech32;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("router_history=info,hyper=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    if let Err(e) = run(config).await {
        error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let mut pipeline_config = config.pipeline().wrap_err("invalid configuration")?;

    let registry = AbiRegistry::load(&pipeline_config.abi_path)
        .wrap_err_with(|| format!("loading ABI from {}", pipeline_config.abi_path.display()))?;
    let router_methods = validate_schemas(&registry)?;
    info!(methods = registry.len(), router_methods, "ABI loaded");

    let tokens = match &pipeline_config.tokens_path {
        Some(path) => TokenList::load(path)?,
        None => TokenList::new(),
    };
    if pipeline_config.wrapped_native.is_none() {
        pipeline_config.wrapped_native = tokens.find_symbol("WONE").map(|t| t.address);
    }

    let transport = HttpTransport::connect(&pipeline_config.rpc_url, pipeline_config.rpc_timeout)?;
    info!(
        rpc_url = %pipeline_config.rpc_url,
        shard = pipeline_config.shard,
        router = %pipeline_config.query.address,
        "fetching router history"
    );

    let pipeline = Pipeline::new(transport, registry, pipeline_config);
    let records = pipeline.run().await?;
    let config = pipeline.config();

    let records = match config.sender_filter {
        Some(sender) => filter_by_sender(records, sender),
        None => records,
    };
    info!(
        records = records.len(),
        senders = group_by_sender(&records).len(),
        blocks = group_by_block(&records).len(),
        categories = ?category_counts(&records),
        "transactions decoded"
    );

    let label = config.selection.label();
    let selected = select(records, config.selection);
    if selected.is_empty() {
        info!("no {label} transactions found for router {}", config.query.address);
        return Ok(());
    }

    let sender_label = config.sender_filter.as_ref().map(to_bech32);
    let path = report_path(&config.output_dir, sender_label.as_deref(), config.selection);
    let ctx = TokenContext {
        tokens: &tokens,
        wrapped_native: config.wrapped_native,
        native_symbol: &config.native_symbol,
    };
    let written = export_records_csv(&selected, &ctx, &path)
        .wrap_err_with(|| format!("writing report to {}", path.display()))?;

    info!(rows = written, path = %path.display(), "found {written} {label} transactions");
    Ok(())
}
