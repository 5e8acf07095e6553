use anyhow::{anyhow, Context};
use clap::Parser;
use fragment_loader::domain::ports::ElementHandle;
use fragment_loader::utils::{logger, validation::Validate};
use fragment_loader::{
    CliConfig, Dispatcher, FragmentLoader, HttpFetcher, MemoryDocument, PageFixture,
    ReplayEventSource,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(cli).await {
        tracing::error!("fragment-loader failed: {:#}", e);
        eprintln!("fragment-loader error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: CliConfig) -> anyhow::Result<()> {
    let config = cli.loader_config()?;
    config.validate().context("invalid loader configuration")?;

    let fixture = PageFixture::from_file(&cli.page)
        .with_context(|| format!("failed to load page {}", cli.page.display()))?;
    let document = MemoryDocument::from_fixture(fixture)?;

    let clicks = cli
        .clicks
        .iter()
        .map(|id| {
            document
                .elements()
                .iter()
                .find(|element| element.id() == Some(id.as_str()))
                .cloned()
                .ok_or_else(|| anyhow!("no element with id `{}` on the page", id))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let fetcher = HttpFetcher::with_options(config.request_timeout(), config.user_agent.as_deref())?;
    let dispatcher = Dispatcher::new(FragmentLoader::new(document, fetcher, config)?);

    let mut source = ReplayEventSource::new(clicks);
    let report = dispatcher.run(&mut source).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for element in dispatcher.loader().document().elements() {
            println!("{}: {}", element.describe(), element.content());
        }
        if report.failed() > 0 {
            eprintln!("{} of {} clicks failed", report.failed(), report.clicks);
        }
    }

    Ok(())
}
