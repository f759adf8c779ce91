use clap::Parser;

use labelcheck::Cli;

fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // RUST_LOG, when set, overrides the flags and the config file.
    env_logger::Builder::new()
        .filter_level(cli.log_filter(config.log_level))
        .parse_default_env()
        .init();

    if let Err(e) = labelcheck::run(cli, config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
