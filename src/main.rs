use log::{error, info};
use std::env;
use std::process;

use spaceship_painter::cli::{print_usage, CliArgs};
use spaceship_painter::config::Config;
use spaceship_painter::game::Session;

#[tokio::main]
async fn main() {
    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    let cli = match CliArgs::parse(env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            process::exit(1);
        }
    };

    if cli.help {
        print_usage();
        return;
    }

    let mut config = match &cli.config_path {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Warning: Could not load config from '{}': {}", path, e);
            eprintln!("Using default configuration");
            Config::default_hardcoded()
        }),
        None => Config::load_or_default(),
    };
    cli.apply(&mut config);

    info!("Starting Spaceship Painter...");

    let session = match Session::from_config(&config).await {
        Ok(session) => session,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    if let Some(path) = session.log().path() {
        info!("Logging moves to {}", path.display());
    }

    match session.run().await {
        Ok(summary) => {
            println!("{}", summary.final_state);
            for (player, score) in summary.scores() {
                println!("{}: {:02}", player, score);
            }
            let leaders: Vec<String> = summary.leaders().iter().map(|p| p.to_string()).collect();
            println!(
                "Finished after {} moves, leading: {}",
                summary.moves.len(),
                leaders.join(", ")
            );
        }
        Err(e) => {
            error!("Game aborted: {}", e);
            process::exit(1);
        }
    }
}
