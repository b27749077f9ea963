pub mod command;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::command::Command;
use tessera_cli::Format;
use tessera_service::{DefaultProviders, TesseraService};
use tessera_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = tessera_cli::VERSION,
	rename_all = "kebab",
	styles = tessera_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'o', value_enum, default_value_t = Format::Pretty)]
	pub output: Format,
	#[command(subcommand)]
	pub command: Command,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = tessera_config::load(&args.config)?;

	init_tracing(&config)?;

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let service = TesseraService::from_config(
		&config,
		Arc::new(qdrant),
		Arc::new(db),
		Arc::new(DefaultProviders),
	)?;
	let value = args.command.execute(&service).await?;

	println!("{}", args.output.render(&value)?);

	Ok(())
}

fn init_tracing(config: &tessera_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	Ok(())
}
