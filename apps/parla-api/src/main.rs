use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = parla_api::Args::parse();

	parla_api::run(args).await
}
