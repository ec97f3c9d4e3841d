use slipline_frame::{Decoder, FrameConfig, FrameError};
use tracing::{debug, warn};

use crate::cmd::{parse_hex, read_file, read_stdin, DecodeArgs};
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.frame.config()?;
    let (wire, source) = match (&args.hex, &args.file) {
        (Some(hex), _) => (parse_hex(hex)?, "hex".to_string()),
        (None, Some(path)) => (read_file(path)?, path.display().to_string()),
        (None, None) => (read_stdin()?, "stdin".to_string()),
    };

    let (frames, errors) = decode_all(&wire, &config);
    for (offset, err) in &errors {
        warn!(offset, error = %err, "framing error");
    }
    debug!(
        wire = wire.len(),
        frames = frames.len(),
        errors = errors.len(),
        "decoded input"
    );

    for (index, frame) in frames.iter().enumerate() {
        print_frame(index, frame, &source, format);
    }

    if errors.is_empty() {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

/// Run `wire` through the incremental decoder, collecting frames and the
/// offset of every framing error.
fn decode_all(wire: &[u8], config: &FrameConfig) -> (Vec<Vec<u8>>, Vec<(usize, FrameError)>) {
    let mut frames = Vec::new();
    let mut errors = Vec::new();
    let mut decoder = Decoder::with_config(config, |frame: &[u8]| frames.push(frame.to_vec()));
    for (offset, byte) in wire.iter().enumerate() {
        if let Err(err) = decoder.feed(*byte) {
            errors.push((offset, err));
        }
    }
    drop(decoder);
    (frames, errors)
}
