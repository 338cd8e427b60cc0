//! simgate CLI client
//!
//! Sends requests to the simgate daemon over TCP, one JSON line per request.
//! Uses rustyline for readline-style editing and history.

use clap::Parser;
use rustyline::Editor;
use rustyline::history::FileHistory;
use serde_json::{Map, Value, json};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "simgate-cli")]
#[command(about = "simgate daemon CLI client")]
struct Args {
    /// Daemon address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9710")]
    target: String,

    /// Response timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// History file path
    #[arg(long)]
    history_file: Option<PathBuf>,
}

/// CLI configuration
#[derive(Debug, Clone)]
struct Config {
    target: String,
    response_timeout_secs: u64,
    history_file: PathBuf,
}

impl Config {
    fn from_args(args: Args) -> Self {
        let history_file = args.history_file.unwrap_or_else(|| {
            dirs::home_dir()
                .map(|p| p.join(".simgate_history"))
                .unwrap_or_else(|| PathBuf::from(".simgate_history"))
        });

        Self {
            target: args.target,
            response_timeout_secs: args.timeout,
            history_file,
        }
    }
}

/// Split `<type> [json-params]` into an operation type and params
fn parse_input(input: &str) -> Result<(String, Map<String, Value>), String> {
    let input = input.trim();
    let (op_type, rest) = match input.split_once(char::is_whitespace) {
        Some((t, rest)) => (t, rest.trim()),
        None => (input, ""),
    };
    if op_type.is_empty() {
        return Err("missing operation type".to_string());
    }
    if rest.is_empty() {
        return Ok((op_type.to_string(), Map::new()));
    }
    match serde_json::from_str::<Value>(rest) {
        Ok(Value::Object(params)) => Ok((op_type.to_string(), params)),
        Ok(_) => Err("params must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON params: {}", e)),
    }
}

/// Main client state
struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    config: Config,
    next_id: AtomicU64,
}

impl Client {
    /// Connect to the daemon
    async fn connect(config: Config) -> io::Result<Self> {
        let stream = TcpStream::connect(&config.target).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a request and wait for the response carrying its id
    async fn send_request(&mut self, op_type: String, params: Map<String, Value>) -> io::Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let request = json!({ "id": id, "type": op_type, "params": params });

        let mut line = serde_json::to_string(&request).map_err(io::Error::other)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let wait = Duration::from_secs(self.config.response_timeout_secs);
        timeout(wait, self.read_response(&id))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "Response timeout"))?
    }

    /// Read lines until one answers `id`; unrelated responses are skipped
    async fn read_response(&mut self, id: &str) -> io::Result<Value> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by daemon",
                ));
            }
            let response: Value = serde_json::from_str(line.trim())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if response["id"] == id || response["id"].is_null() {
                return Ok(response);
            }
        }
    }
}

fn main() -> io::Result<()> {
    // Parse arguments
    let args = Args::parse();
    let config = Config::from_args(args);

    // Build runtime for async network operations
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_client(config).await })
}

async fn run_client(config: Config) -> io::Result<()> {
    let mut client = Client::connect(config.clone()).await?;

    let mut rl: Editor<(), FileHistory> = Editor::new().map_err(io::Error::other)?;

    if config.history_file.exists()
        && let Err(e) = rl.load_history(&config.history_file)
    {
        eprintln!("[warning] Failed to load history: {}", e);
    }

    println!("simgate-cli v{}", env!("CARGO_PKG_VERSION"));
    println!("Target: {}", config.target);
    println!("Enter `<type> [json-params]`, e.g. noop.echo {{\"message\":\"hi\"}}. :quit or Ctrl+D to quit.");
    println!();

    loop {
        let readline = rl.readline("> ");

        match readline {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == ":quit" {
                    break;
                }

                let _ = rl.add_history_entry(input);

                let (op_type, params) = match parse_input(input) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        println!("[error] {}", e);
                        continue;
                    }
                };

                print!("[waiting...]");
                io::stdout().flush()?;

                match client.send_request(op_type, params).await {
                    Ok(response) => {
                        print!("\r");
                        let pretty = serde_json::to_string_pretty(&response)
                            .unwrap_or_else(|_| response.to_string());
                        println!("{}", pretty);
                    }
                    Err(e) => {
                        print!("\r");
                        println!("[error] {}", e);
                        if e.kind() == io::ErrorKind::UnexpectedEof {
                            break;
                        }
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ctrl+C - cancel current input, continue
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("[error] Readline error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&config.history_file) {
        eprintln!("[warning] Failed to save history: {}", e);
    }

    println!("\nGoodbye!");
    Ok(())
}
