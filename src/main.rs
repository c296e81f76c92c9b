use clap::Parser;
use env_logger::Env;
use rondo::cli::{Cli, Commands};
use rondo::commands::{solve, update_cache};

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::UpdateCache(args) => update_cache::run(&args),
        Commands::Solve(args) => solve::run(&args),
    };

    if let Err(error) = result {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
