//! Terminal front end: drives a game connection from stdin and prints what
//! the engine shows.

use anyhow::{bail, Context, Result};
use clap::Parser;
use hub::{
    Connection, ConnectionConfig, ConnectionError, ConnectionFactory, EventSink, ExitPolicy,
    TextAttr, WindowId, WindowType,
};
use log::{debug, info};
use mock::EchoLoader;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for the engine to prompt again after each input line.
const PROMPT_WAIT: Duration = Duration::from_secs(5);

/// Parsing of the line-oriented input syntax.
mod input {
    use anyhow::{anyhow, bail, Result};

    /// One stdin line, decoded.
    #[derive(Debug, PartialEq, Eq)]
    pub enum Input {
        Keys(Vec<char>),
        DirKey(char),
        Line(String),
        Position(i32, i32),
        Menu(Vec<i32>),
        Save,
        Abort,
        Quit,
        Nothing,
    }

    /// Plain text is sent key by key; `:`-prefixed lines are commands.
    pub fn parse(raw: &str) -> Result<Input> {
        let text = raw.trim_end_matches(['\r', '\n']);
        let Some(command) = text.strip_prefix(':') else {
            return Ok(if text.is_empty() {
                Input::Nothing
            } else {
                Input::Keys(text.chars().collect())
            });
        };
        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        match name {
            "quit" | "q" => Ok(Input::Quit),
            "save" => Ok(Input::Save),
            "abort" | "esc" => Ok(Input::Abort),
            "line" => Ok(Input::Line(rest.to_owned())),
            "dir" => {
                let mut chars = rest.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(key), None) => Ok(Input::DirKey(key)),
                    _ => bail!(":dir takes exactly one key"),
                }
            }
            "pos" => {
                let coords = numbers(rest)?;
                match coords.as_slice() {
                    [x, y] => Ok(Input::Position(*x, *y)),
                    _ => bail!(":pos takes two numbers"),
                }
            }
            "menu" => Ok(Input::Menu(numbers(rest)?)),
            other => bail!("unknown command :{other}"),
        }
    }

    fn numbers(text: &str) -> Result<Vec<i32>> {
        text.split_whitespace()
            .map(|word| {
                word.parse::<i32>()
                    .map_err(|err| anyhow!("bad number `{word}`: {err}"))
            })
            .collect()
    }
}

use input::Input;

#[derive(Parser, Debug)]
#[command(author, version, about = "Play a forkfront game from the terminal", long_about = None)]
struct Cli {
    /// Native engine library (e.g. nethack, slashem).
    #[arg(short, long, conflicts_with = "config")]
    library: Option<String>,

    /// TOML connection config to use instead of --library.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory handed to the engine for its data files.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    data_dir: PathBuf,

    /// Run the built-in echo engine instead of loading a library.
    #[arg(long)]
    mock: bool,
}

/// Prints engine output to the terminal.
struct TerminalSink;

impl EventSink for TerminalSink {
    fn on_create_window(&self, id: WindowId, kind: WindowType) {
        debug!("window {id} created (type {})", kind.0);
    }

    fn on_clear_window(&self, id: WindowId) {
        debug!("window {id} cleared");
    }

    fn on_put_string(&self, id: WindowId, attr: TextAttr, text: &str) {
        if attr == TextAttr::NONE {
            println!("[{id}] {text}");
        } else {
            println!("[{id}|{:#x}] {text}", attr.bits());
        }
    }

    fn on_ready(&self) {
        print!("> ");
        let _ = io::stdout().flush();
    }

    fn on_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn on_connected(&self) {
        info!("connected");
    }

    fn on_disconnected(&self) {
        info!("disconnected");
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = connection_config(&cli)?;
    let factory = if cli.mock {
        ConnectionFactory::builder()
            .loader(Arc::new(EchoLoader))
            .exit_policy(ExitPolicy::Thread)
            .build()
    } else {
        ConnectionFactory::default()
    };
    let conn = factory
        .create_connection(&config)
        .context("building connection")?;

    let sink: Arc<dyn EventSink> = Arc::new(TerminalSink);
    conn.set_handler(Some(&sink));
    conn.start(&cli.data_dir)
        .with_context(|| format!("starting {} connection", conn.connection_type()))?;

    let outcome = run_input_loop(conn.as_ref());
    conn.disconnect();
    outcome
}

fn connection_config(cli: &Cli) -> Result<ConnectionConfig> {
    if let Some(path) = &cli.config {
        return ConnectionConfig::load(path)
            .with_context(|| format!("loading {}", path.display()));
    }
    match (&cli.library, cli.mock) {
        (Some(library), _) => Ok(ConnectionConfig::for_local(library.as_str(), library.as_str())),
        (None, true) => Ok(ConnectionConfig::for_local("echo", "echo")),
        (None, false) => bail!("pass --library, --config, or --mock"),
    }
}

fn run_input_loop(conn: &dyn Connection) -> Result<()> {
    if !await_prompt(conn)? {
        return Ok(());
    }
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let input = match input::parse(&line) {
            Ok(input) => input,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match input {
            Input::Quit => break,
            Input::Nothing => continue,
            Input::Keys(keys) => keys.into_iter().for_each(|key| conn.send_key(key)),
            Input::DirKey(key) => conn.send_directional_key(key),
            Input::Line(text) => conn.send_line(&text),
            Input::Position(x, y) => conn.send_position(x, y),
            Input::Menu(ids) => conn.send_menu_selection(&ids),
            Input::Save => conn.save_state(),
            Input::Abort => conn.abort(),
        }
        if !await_prompt(conn)? {
            break;
        }
    }
    Ok(())
}

/// Waits for the next prompt. `false` once the session is over.
fn await_prompt(conn: &dyn Connection) -> Result<bool> {
    match conn.wait_ready_timeout(PROMPT_WAIT) {
        Ok(()) => Ok(true),
        Err(ConnectionError::Disconnected) => Ok(false),
        Err(ConnectionError::TimedOut) => {
            debug!("engine still busy after {PROMPT_WAIT:?}");
            Ok(conn.is_connected())
        }
        Err(err) => Err(err).context("waiting for the engine"),
    }
}
