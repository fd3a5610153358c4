use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = parla_worker::Args::parse();

	parla_worker::run(args).await
}
