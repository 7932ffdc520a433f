use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use threadview_core::logging::{self, LogConfig};
use threadview_core::{
    FetchOptions, OpenAiClient, Overrides, Settings, TerminalOptions, ThreadId,
    aggregate_to_raw_json, fetch_thread, render_terminal, render_thread_markdown, terminal_width,
};

#[derive(Debug, Parser)]
#[command(
    name = "threadviewer",
    version,
    about = "Render an OpenAI Assistants thread in the terminal"
)]
struct Cli {
    /// Thread id like thread_abc123, openai://threads/<id>, or a platform.openai.com URL carrying one
    thread: String,

    /// API key (overrides THREADVIEWER_API_KEY / OPENAI_API_KEY and the config file)
    #[arg(long)]
    api_key: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// API base URL, e.g. https://api.openai.com/v1
    #[arg(long)]
    base_url: Option<String>,

    /// Output the fetched thread as raw JSON instead of markdown
    #[arg(long, conflicts_with = "plain")]
    raw: bool,

    /// Output markdown without terminal formatting
    #[arg(long)]
    plain: bool,

    /// Render width in columns (defaults to the terminal width, or 80)
    #[arg(long)]
    width: Option<usize>,

    /// Follow pagination cursors instead of reading only the first page
    #[arg(long)]
    all_pages: bool,

    /// Items requested per page (1-100)
    #[arg(long)]
    page_size: Option<u32>,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&LogConfig::from_env(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> threadview_core::Result<()> {
    let thread_id = ThreadId::parse(&cli.thread)?;
    let settings = Settings::load(Overrides {
        api_key: cli.api_key,
        base_url: cli.base_url,
        config_path: cli.config,
        page_size: cli.page_size,
    })?;

    let client = OpenAiClient::new(settings.api)?;
    let options = FetchOptions {
        page_size: settings.page_size,
        follow_pages: cli.all_pages,
    };
    let aggregate = fetch_thread(&client, &thread_id, &options)?;

    if cli.raw {
        print!("{}", aggregate_to_raw_json(&aggregate)?);
        return Ok(());
    }

    let markdown = render_thread_markdown(&aggregate);
    if cli.plain {
        print!("{markdown}");
        return Ok(());
    }

    let stdout_is_terminal = io::stdout().is_terminal();
    let options = TerminalOptions {
        width: cli.width.unwrap_or_else(terminal_width),
        color: stdout_is_terminal && env::var_os("NO_COLOR").is_none(),
    };
    print!("{}", render_terminal(&markdown, &options));

    Ok(())
}
