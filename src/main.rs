mod cat;
mod client;
mod command;
mod config;
mod dereference;
mod logging;
mod output;

use crate::cat::{CatError, CatRequest};
use crate::client::{ClientError, EsClient, ResponseData};
use crate::command::{Command, CommandError};
use crate::config::{Config, ConfigError};
use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, warn};

const EXIT_USAGE: u8 = 2;
const EXIT_TRANSPORT: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "escat",
    version,
    about = "Print Elasticsearch cluster state from the cat and cluster APIs",
    override_usage = "escat [OPTIONS] COMMAND [ARG] [_]"
)]
struct Cli {
    #[arg(
        long,
        env = "ES_HOST",
        value_name = "URL",
        help = "Elasticsearch host URL"
    )]
    host: Option<String>,

    #[arg(
        long,
        env = "ES_USER",
        help = "Elasticsearch user (defaults to elastic)"
    )]
    user: Option<String>,

    #[arg(
        long,
        env = "ES_PASS",
        hide_env_values = true,
        help = "Elasticsearch password"
    )]
    password: Option<String>,

    #[arg(long, help = "Set the output format to JSON")]
    json: bool,

    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Pretty print JSON output (--pretty=false to disable)"
    )]
    pretty: bool,

    #[arg(short, long, help = "Print column headers")]
    verbose: bool,

    #[arg(short, long, value_name = "COLUMNS", help = "Columns to print")]
    fields: Option<String>,

    #[arg(short, long, value_name = "COLUMNS", help = "Columns to sort by")]
    sort: Option<String>,

    #[arg(short, long, help = "Log requests and responses to stderr")]
    debug: bool,

    #[arg(short = 'k', long, help = "Skip TLS certificate verification")]
    insecure: bool,

    #[arg(value_name = "COMMAND")]
    command: Option<String>,

    #[arg(value_name = "ARG", help = "Repository, index prefix or item name")]
    target: Option<String>,

    #[arg(value_name = "_", help = "Fetch the full definition of each listed item")]
    trailing: Option<String>,
}

fn main() -> ExitCode {
    let matches = Cli::command()
        .after_help(command::help_table())
        .get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    logging::init(cli.debug);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code(&err)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let effective = config::resolve(
        &cwd,
        Config {
            host: cli.host,
            user: cli.user,
            password: cli.password,
            insecure: cli.insecure,
        },
    )?;

    let Some(name) = cli.command.as_deref() else {
        Cli::command()
            .after_help(command::help_table())
            .print_help()
            .context("printing help")?;
        return Ok(ExitCode::SUCCESS);
    };
    let command: Command = name.parse()?;
    debug!(%command, input = name, "resolved command");

    if cli
        .target
        .as_deref()
        .is_some_and(|arg| arg.eq_ignore_ascii_case("help"))
    {
        print_usage(command)?;
        return Ok(ExitCode::SUCCESS);
    }

    let request = CatRequest::from_positionals(
        cli.json,
        cli.verbose,
        cli.fields,
        cli.sort,
        cli.target,
        cli.trailing,
    )?;

    let client = EsClient::new(
        &effective.host,
        Some(&effective.user),
        effective.password.as_deref(),
        effective.insecure,
    )?;
    let response = cat::execute(&client, command, &request)?;

    emit(&response, cli.pretty, &mut io::stdout().lock())?;

    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(status = response.status, "cluster answered with an error");
        Ok(ExitCode::FAILURE)
    }
}

/// Renders the response; a reader that stops early (`escat ... | head`) is not
/// an error.
fn emit(response: &ResponseData, pretty: bool, out: &mut impl Write) -> Result<()> {
    let written = output::render(response, pretty, &mut *out)
        .and_then(|()| out.flush().context("flushing output"));
    match written {
        Err(err) if is_broken_pipe(&err) => {
            debug!("output closed before the response was written");
            Ok(())
        }
        other => other,
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

fn print_usage(command: Command) -> Result<()> {
    Cli::command()
        .about(command.spec().about)
        .override_usage(command.usage())
        .print_help()
        .context("printing usage")
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if cause.is::<ConfigError>()
            || cause.is::<CommandError>()
            || cause.is::<CatError>()
            || cause.is::<serde_yaml::Error>()
        {
            return ExitCode::from(EXIT_USAGE);
        }
        if cause.is::<ClientError>() {
            return ExitCode::from(EXIT_TRANSPORT);
        }
    }
    ExitCode::FAILURE
}
