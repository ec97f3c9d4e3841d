use slipline_frame::{encoded_len, FrameWriter};
use slipline_transport::{UdpChannel, UdpConfig};

use crate::cmd::SendArgs;
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.frame.config()?;
    let payload = args.payload.resolve()?;

    let udp_config = UdpConfig {
        log_data: args.log_data,
        ..UdpConfig::default()
    };
    let channel = UdpChannel::open_with_config(args.bind.as_str(), args.dest.as_str(), udp_config)
        .map_err(|err| transport_error("open failed", err))?;

    let mut writer = FrameWriter::with_config(channel, config);
    let sent = writer
        .send(&payload)
        .map_err(|err| frame_error("send failed", err))?;

    print_sent(
        &writer.get_ref().peer_addr().to_string(),
        payload.len(),
        encoded_len(&payload),
        sent,
        format,
    );
    Ok(SUCCESS)
}
