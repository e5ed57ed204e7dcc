//! Command-line interface for session-keeper.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Cookie / query parameter name for the session id.
    pub id_name: Option<String>,
    /// Session lifetime in seconds.
    pub max_lifetime: Option<i64>,
    /// Transport mode name (query, cookie).
    pub transport: Option<String>,
    /// Reaper cadence in seconds.
    pub sweep_interval: Option<u64>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('n') | Long("id-name") => {
                result.id_name = Some(parser.value()?.parse()?);
            }
            Short('m') | Long("max-lifetime") => {
                let value: String = parser.value()?.parse()?;
                result.max_lifetime = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("max-lifetime", value))?,
                );
            }
            Short('t') | Long("transport") => {
                result.transport = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("sweep-interval") => {
                let value: String = parser.value()?.parse()?;
                result.sweep_interval = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("sweep-interval", value))?,
                );
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"session-keeper {version}
In-process HTTP session store demo server

USAGE:
    session-keeper [OPTIONS]

OPTIONS:
    -H, --host <ADDR>            Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>            Port to listen on [default: 3000]
    -c, --config <FILE>          Path to configuration file (JSON)
    -n, --id-name <NAME>         Cookie / query parameter name [default: SESSIONID]
    -m, --max-lifetime <SECS>    Idle lifetime of a session [default: 1800]
    -t, --transport <MODE>       Identifier transport: query | cookie [default: cookie]
    -s, --sweep-interval <SECS>  Reaper cadence [default: lifetime / 4]
    -l, --log-level <LVL>        Log level (error, warn, info, debug, trace)
    -h, --help                   Print help
    -V, --version                Print version

ENVIRONMENT VARIABLES:
    SESSION_KEEPER_HOST          Host address (overrides config)
    SESSION_KEEPER_PORT          Port number (overrides config)
    SESSION_KEEPER_ID_NAME       Identifier name (overrides config)
    SESSION_KEEPER_MAX_LIFETIME  Session lifetime in seconds (overrides config)
    SESSION_KEEPER_TRANSPORT     Transport mode (overrides config)
    SESSION_KEEPER_LOG_LEVEL     Log level (overrides config)
    RUST_LOG                     Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000, cookie sessions, 30 min lifetime)
    session-keeper

    # Query-parameter sessions that expire after 5 minutes
    session-keeper -t query -m 300

    # Start with config file
    session-keeper -c /etc/session-keeper/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("session-keeper {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
