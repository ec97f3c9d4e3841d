use bytes::BytesMut;
use slipline_frame::encode_frame;
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.frame.config()?;
    let payload = args.payload.resolve()?;

    let mut wire = BytesMut::with_capacity(config.capacity);
    encode_frame(&payload, &mut wire, config.capacity)
        .map_err(|err| frame_error("encode failed", err))?;
    debug!(payload = payload.len(), wire = wire.len(), "encoded frame");

    print_encoded(payload.len(), &wire, format);
    Ok(SUCCESS)
}
