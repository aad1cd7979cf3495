use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = glycoctl::Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = glycoctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
