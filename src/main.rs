//! Session-keeper binary entry point.

use std::process::ExitCode;

use session_keeper::api::{serve, AppState};
use session_keeper::cli::{parse_args, print_help, print_version};
use session_keeper::config::Config;
use session_keeper::{logging, SessionManager};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'session-keeper --help' for more information.");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_with_filter(config.log_filter()).ok();
    info!("session-keeper v{}", env!("CARGO_PKG_VERSION"));

    let (server_config, manager_config) =
        match (config.to_server_config(), config.to_manager_config()) {
            (Ok(server), Ok(manager)) => (server, manager),
            (Err(e), _) | (_, Err(e)) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        };

    let manager = match SessionManager::new(manager_config) {
        Ok(manager) => manager,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = serve(server_config, AppState::new(manager)).await {
        error!("server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("session-keeper stopped");
    ExitCode::SUCCESS
}
