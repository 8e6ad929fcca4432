use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::net::Shutdown;
use std::thread;

use tracing::{debug, info, warn};
use westpipe_frame::{FrameWriter, HEARTBEAT_LINE};
use westpipe_transport::UnixDomainSocket;

use crate::cmd::{parse_duration, ReplayArgs};
use crate::exit::{
    frame_error, io_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS,
};

pub fn run(args: ReplayArgs) -> CliResult<i32> {
    let script = fs::read_to_string(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;
    let frames = script_frames(&script);
    let interval = parse_duration(&args.interval)?;

    let stream = UnixDomainSocket::connect(&args.path)
        .map_err(|err| transport_error("connect failed", err))?;
    let heartbeats = match &args.outbound {
        Some(path) => UnixDomainSocket::connect(path),
        None => stream.try_clone(),
    }
    .map_err(|err| transport_error("connect failed", err))?;
    let drain = thread::spawn(move || drain_heartbeats(heartbeats));

    let mut writer = FrameWriter::new(stream);
    for (index, frame) in frames.iter().enumerate() {
        if index > 0 {
            thread::sleep(interval);
        }
        writer
            .send(frame)
            .map_err(|err| frame_error("send failed", err))?;
    }
    info!(frames = frames.len(), "script sent");

    // Half-close so the host sees end of stream while heartbeats still drain.
    writer
        .get_ref()
        .shutdown(Shutdown::Write)
        .map_err(|err| transport_error("shutdown failed", err))?;

    let beats = drain
        .join()
        .map_err(|_| CliError::new(INTERNAL, "heartbeat reader panicked"))?;
    info!(heartbeats = beats, "host closed the connection");

    Ok(SUCCESS)
}

/// Frame texts of a script: one per line, skipping blanks and `#` comments.
fn script_frames(script: &str) -> Vec<String> {
    script
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn drain_heartbeats<R: Read>(stream: R) -> u64 {
    let mut beats = 0u64;
    for line in BufReader::new(stream).lines() {
        match line {
            Ok(line) if line == HEARTBEAT_LINE => beats += 1,
            Ok(line) => debug!(%line, "unexpected line on outbound leg"),
            Err(err) => {
                warn!(error = %err, "heartbeat read failed");
                break;
            }
        }
    }
    beats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_skips_blanks_and_comments() {
        let script = "# config\r\nGUI_DATA_CONF_8378|{} GUI_DATA_CONF_3434_END\r\n\n   \n  # tick\nGUI_DATA_8378|{}\n";
        assert_eq!(
            script_frames(script),
            vec![
                "GUI_DATA_CONF_8378|{} GUI_DATA_CONF_3434_END".to_string(),
                "GUI_DATA_8378|{}".to_string(),
            ]
        );
    }

    #[test]
    fn drain_counts_heartbeats_until_eof() {
        let (ours, theirs) = std::os::unix::net::UnixStream::pair().unwrap();
        let writer = thread::spawn(move || {
            use std::io::Write;
            let mut theirs = theirs;
            theirs
                .write_all(format!("{HEARTBEAT_LINE}\nnoise\n{HEARTBEAT_LINE}\n").as_bytes())
                .unwrap();
        });
        writer.join().unwrap();

        assert_eq!(drain_heartbeats(ours), 2);
    }
}
