use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use slipline_frame::{FrameConfig, BUF_SIZE};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a payload into a wire frame.
    Encode(EncodeArgs),
    /// Decode wire bytes into frames.
    Decode(DecodeArgs),
    /// Send a single frame over UDP.
    Send(SendArgs),
    /// Receive frames over UDP and print them.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct FrameArgs {
    /// Frame buffer capacity in bytes.
    #[arg(long, default_value_t = BUF_SIZE, env = "SLIPLINE_CAPACITY")]
    pub capacity: usize,
}

impl FrameArgs {
    pub fn config(&self) -> CliResult<FrameConfig> {
        if self.capacity < 4 {
            return Err(CliError::new(USAGE, "--capacity must be at least 4"));
        }
        Ok(FrameConfig {
            capacity: self.capacity,
            ..FrameConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Payload as a UTF-8 string.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Payload as hex bytes (e.g. "0a 01 c0" or "0x0a,0x01").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    /// Resolve the payload; an empty payload when nothing was given.
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return parse_hex(hex);
        }
        if let Some(path) = &self.file {
            return read_file(path);
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex. Reads stdin when neither --hex nor --file is set.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read wire bytes from file.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0:0")]
    pub bind: String,
    /// Destination address.
    #[arg(long)]
    pub dest: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Trace every datagram as hex (needs --log-level trace).
    #[arg(long)]
    pub log_data: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local address to bind.
    #[arg(long)]
    pub bind: String,
    /// Address of the sending side.
    #[arg(long)]
    pub dest: String,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit with code 124 if no frame arrives for this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Socket read timeout used to poll for Ctrl-C.
    #[arg(long, default_value = "100ms")]
    pub poll: String,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Trace every datagram as hex (needs --log-level trace).
    #[arg(long)]
    pub log_data: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex bytes, tolerating whitespace, `,` and `:` separators and `0x`
/// prefixes.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("hex input has an odd number of digits: {input}"),
        ));
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .filter(|pair| pair.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::new(USAGE, format!("invalid hex input: {input}")))
        })
        .collect()
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

pub fn read_stdin() -> CliResult<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(buf)
}
