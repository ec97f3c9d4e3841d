use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use slipline_frame::FrameReader;
use slipline_transport::{UdpChannel, UdpConfig};
use tracing::{info, warn};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.frame.config()?;
    let poll = parse_duration(&args.poll)?;
    let idle_timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let udp_config = UdpConfig {
        read_timeout: Some(poll),
        log_data: args.log_data,
    };
    let channel = UdpChannel::open_with_config(args.bind.as_str(), args.dest.as_str(), udp_config)
        .map_err(|err| transport_error("open failed", err))?;
    let source = channel.peer_addr().to_string();
    let mut reader = FrameReader::with_config(channel, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut framing_errors = 0usize;
    let mut last_activity = Instant::now();

    while running.load(Ordering::SeqCst) {
        match reader.read_frame() {
            Ok(Some(frame)) => {
                print_frame(printed, frame.payload.as_ref(), &source, format);
                printed = printed.saturating_add(1);
                last_activity = Instant::now();

                if args.count.is_some_and(|count| printed >= count) {
                    return Ok(SUCCESS);
                }
            }
            Ok(None) => {
                if idle_timeout.is_some_and(|limit| last_activity.elapsed() >= limit) {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("no frame received from {source} within timeout"),
                    ));
                }
            }
            Err(err) if err.is_framing() => {
                framing_errors = framing_errors.saturating_add(1);
                warn!(error = %err, "framing error");
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        }
    }

    info!(frames = printed, framing_errors, "listener stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
