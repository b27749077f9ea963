use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = tessera_search::Args::parse();

	tessera_search::run(args).await
}
