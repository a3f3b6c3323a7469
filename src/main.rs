use clap::Parser;
use std::sync::Arc;
use switchyard::cli::{
    admission, backends, capabilities, check, handle_completions, handle_config_init,
    load_config, offline_engine, simulate, BackendsCommands, CapabilitiesCommands, Cli, Commands,
    ConfigCommands,
};
use switchyard::dispatch::NullTransport;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Serve(args) => switchyard::cli::serve::run_serve(args).await,
        Commands::Backends(BackendsCommands::List(args)) => load_config(&args.config)
            .and_then(|config| offline_engine(&config, Arc::new(NullTransport)))
            .and_then(|engine| backends::handle_backends_list(&args, &engine))
            .map(|output| println!("{}", output)),
        Commands::Capabilities(CapabilitiesCommands::List(args)) => load_config(&args.config)
            .and_then(|config| offline_engine(&config, Arc::new(NullTransport)))
            .map(|engine| println!("{}", capabilities::handle_capabilities_list(&args, &engine))),
        Commands::Admission(args) => load_config(&args.config)
            .and_then(|config| offline_engine(&config, Arc::new(NullTransport)))
            .map(|engine| println!("{}", admission::handle_admission(&args, &engine))),
        Commands::Check(args) => check::handle_check(&args).map(|output| println!("{}", output)),
        Commands::Simulate(args) => simulate::handle_simulate(&args)
            .await
            .map(|output| println!("{}", output)),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => {
                handle_config_init(&args).map(|output| println!("{}", output))
            }
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
