use app_state::load_app_settings;
use captioner::cli::{Cli, Command};
use captioner::commands;
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let mut settings = load_app_settings(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.logging.level.as_str().into()),
        )
        .with(fmt::layer())
        .init();

    match &cli.command {
        Command::Caption(args) => {
            args.apply(&mut settings);
            let report = commands::caption(&settings).await?;
            println!("{report}");
        }
        Command::SimpleCaption(args) => {
            if args.dataset.caption_suffix.is_none() {
                settings.captioning.caption_suffix = "simple_caption".to_string();
            }
            args.apply(&mut settings);
            let report = commands::simple_caption(&settings).await;
            println!("{report}");
        }
        Command::ListDatasets(args) => {
            args.apply(&mut settings);
            for line in commands::list_datasets(&settings) {
                println!("{line}");
            }
        }
        Command::Pack(args) => {
            args.dataset.apply(&mut settings);
            let options = args.options(&settings.dataset_root);
            let stats = commands::pack(&settings, options).await?;
            println!("{stats}");
        }
        Command::Convert(args) => {
            commands::convert(&args.root, &args.into()).await?;
        }
    }

    Ok(())
}
