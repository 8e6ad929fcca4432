use std::fs;

use tracing::debug;
use westpipe_frame::{
    config_fragments, format_log, format_message, FrameConfig, FrameWriter, DATA_HEADER,
};
use westpipe_transport::UnixDomainSocket;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{
    frame_error, io_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE,
};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let frames = resolve_frames(&args)?;
    let write_timeout = parse_duration(&args.timeout)?;

    let stream = UnixDomainSocket::connect(&args.path)
        .map_err(|err| transport_error("connect failed", err))?;
    let config = FrameConfig {
        write_timeout: Some(write_timeout),
        ..FrameConfig::default()
    };
    let mut writer = FrameWriter::with_config_ipc(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;

    for frame in &frames {
        writer
            .send(frame)
            .map_err(|err| frame_error("send failed", err))?;
    }
    debug!(frames = frames.len(), path = %args.path.display(), "frames sent");

    Ok(SUCCESS)
}

/// Turn the payload flag into the frame texts to send, in order.
fn resolve_frames(args: &SendArgs) -> CliResult<Vec<String>> {
    if let Some(text) = &args.text {
        return Ok(vec![text.clone()]);
    }
    if let Some(data) = &args.data {
        validate_json("--data", data)?;
        let frame = format_message(DATA_HEADER, data)
            .map_err(|err| frame_error("invalid --data", err))?;
        return Ok(vec![frame]);
    }
    if let Some(path) = &args.config {
        let document = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        validate_json("--config", &document)?;
        return config_fragments(&document, args.fragment_units)
            .map_err(|err| frame_error("invalid --config", err));
    }
    if let Some(log) = &args.log {
        let (level, text) = log
            .split_once(':')
            .ok_or_else(|| CliError::new(USAGE, "--log must look like LEVEL:TEXT"))?;
        return Ok(vec![format_log(level, text)]);
    }
    Err(CliError::new(
        USAGE,
        "one of --text, --data, --config or --log is required",
    ))
}

fn validate_json(flag: &str, text: &str) -> CliResult<()> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|_| ())
        .map_err(|err| CliError::new(DATA_INVALID, format!("{flag} is not valid JSON: {err}")))
}
