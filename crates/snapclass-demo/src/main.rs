use clap::Parser;
use snapclass_demo::cli::{Cli, Commands};
use snapclass_demo::config::DemoConfig;
use snapclass_demo::session::{Command, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = DemoConfig::load(&cli.config, &cli)?;
    let registry = config.build_registry()?;

    if let Commands::Models = cli.command {
        for id in registry.model_ids() {
            let descriptor = registry.describe(id)?;
            let marker = if registry.default_model_id() == Some(id) { " (default)" } else { "" };
            println!("{}{}  {}  [{}]", id, marker, descriptor.artifact, descriptor.labels.join(", "));
        }
        return Ok(());
    }

    let startup_model = config.startup_model(&registry).map(str::to_string);
    info!(device = %config.device, model = ?startup_model, "Starting snapclass demo");

    let mut session = Session::from_config(&config, registry)?;
    let printer = session.spawn_printer();

    if let Some(id) = startup_model {
        session.handle(Command::SelectModel(id)).await;
    }

    match cli.command {
        Commands::Classify { images, .. } => {
            session.settle().await;
            for path in images {
                session.handle(Command::SelectImage(path)).await;
            }
        }
        Commands::Interactive { .. } => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                match Command::parse(&line) {
                    Ok(Some(command)) => {
                        if !session.handle(command).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
            session.settle().await;
        }
        Commands::Models => {}
    }

    // Let the printer drain what is already queued
    tokio::task::yield_now().await;
    printer.abort();
    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("snapclass=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snapclass=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
