use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = larq_api::Args::parse();

	larq_api::run(args).await
}
