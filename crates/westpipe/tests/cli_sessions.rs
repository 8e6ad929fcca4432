#![cfg(all(unix, feature = "cli"))]

use std::io::{self, Read};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use westpipe_frame::{
    config_fragments, decode_frame, FrameWriter, DATA_HEADER, DEFAULT_MAX_FRAME_UNITS,
};
use westpipe_transport::{IpcStream, UnixDomainSocket};

const CONFIG: &str = r#"{
  "chart1": {"module-type": "linechart", "min-range": 0, "max-range": 50,
             "scroll": false, "series-names": ["speed"]},
  "odom": {"module-type": "odometry"}
}"#;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/wpcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn westpipe() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_westpipe"));
    cmd.env_remove("WESTPIPE_PIPE")
        .env_remove("WESTPIPE_OUTBOUND_PIPE")
        .env_remove("WESTPIPE_HEARTBEAT")
        .arg("--log-level")
        .arg("error");
    cmd
}

fn wait_for_connect(path: &Path, timeout: Duration) -> io::Result<IpcStream> {
    let start = Instant::now();
    loop {
        match UnixDomainSocket::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn wait_for_paths(paths: &[&Path], timeout: Duration) {
    let start = Instant::now();
    while !paths.iter().all(|p| p.exists()) {
        assert!(start.elapsed() < timeout, "host never bound {paths:?}");
        thread::sleep(Duration::from_millis(25));
    }
}

fn stdout_events(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout lines should be json"))
        .collect()
}

#[test]
fn host_prints_snapshots_until_peer_hangs_up() {
    let dir = unique_temp_dir("host");
    let sock_path = dir.join("west.sock");

    let child = westpipe()
        .arg("--format")
        .arg("json")
        .arg("host")
        .arg(&sock_path)
        .arg("--heartbeat")
        .arg("50ms")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("host command should start");

    let stream =
        wait_for_connect(&sock_path, Duration::from_secs(5)).expect("peer should connect");
    let mut writer = FrameWriter::new(stream);
    for fragment in config_fragments(CONFIG, 40).expect("config should fragment") {
        writer.send(&fragment).expect("config fragment should send");
    }
    writer
        .send_message(DATA_HEADER, r#"{"chart1":{"speed":12.5}}"#)
        .expect("tick should send");
    writer
        .send_message(DATA_HEADER, r#"{"odom":{"x":3,"y":4,"heading":90}}"#)
        .expect("tick should send");
    drop(writer);

    let output = child.wait_with_output().expect("host should exit");
    assert!(output.status.success(), "host exited with {}", output.status);

    let events = stdout_events(&output);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["module"], "chart1");
    assert_eq!(events[0]["kind"], "line-chart");
    assert_eq!(events[1]["module"], "odom");
    assert_eq!(events[1]["x"], 3.0);
    assert_eq!(events[1]["heading"], 90.0);

    assert!(!sock_path.exists(), "socket file should be removed");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_drives_a_dual_pipe_host() {
    let dir = unique_temp_dir("replay");
    let inbound = dir.join("in.sock");
    let outbound = dir.join("out.sock");
    let script = dir.join("session.txt");

    // One frame per script line, so the document must not contain newlines.
    let compact: serde_json::Value = serde_json::from_str(CONFIG).expect("config is json");
    let compact = compact.to_string();
    let mut lines = vec!["# configuration".to_string()];
    lines.extend(config_fragments(&compact, 64).expect("config should fragment"));
    lines.push(String::new());
    lines.push(format!(r#"{DATA_HEADER}|{{"odom":{{"x":1,"y":1,"heading":0}}}}"#));
    lines.push(format!(r#"{DATA_HEADER}|{{"odom":{{"x":2,"y":1,"heading":0}}}}"#));
    lines.push("GUI_LOG_8378|INFO|replayed".to_string());
    std::fs::write(&script, lines.join("\n")).expect("script should be writable");

    let host = westpipe()
        .arg("--format")
        .arg("json")
        .arg("host")
        .arg(&inbound)
        .arg("--outbound")
        .arg(&outbound)
        .arg("--heartbeat")
        .arg("10ms")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("host command should start");
    wait_for_paths(&[&inbound, &outbound], Duration::from_secs(5));

    let status = westpipe()
        .arg("replay")
        .arg(&inbound)
        .arg(&script)
        .arg("--outbound")
        .arg(&outbound)
        .arg("--interval")
        .arg("5ms")
        .status()
        .expect("replay should run");
    assert!(status.success(), "replay exited with {status}");

    let output = host.wait_with_output().expect("host should exit");
    assert!(output.status.success());
    let events = stdout_events(&output);
    let xs: Vec<f64> = events
        .iter()
        .filter(|e| e["module"] == "odom")
        .map(|e| e["x"].as_f64().expect("x should be a number"))
        .collect();
    assert_eq!(xs, vec![1.0, 2.0]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_writes_utf16_frames() {
    let dir = unique_temp_dir("send");
    let sock_path = dir.join("peer.sock");
    let listener = UnixListener::bind(&sock_path).expect("test socket should bind");

    let reader = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("send should connect");
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).expect("frames should be readable");
        raw
    });

    let status = westpipe()
        .arg("send")
        .arg(&sock_path)
        .arg("--log")
        .arg("WARNING:battery low: 11.2V")
        .status()
        .expect("send should run");
    assert!(status.success());

    let raw = reader.join().expect("reader thread should finish");
    let mut wire = BytesMut::from(raw.as_slice());
    let frame = decode_frame(&mut wire, DEFAULT_MAX_FRAME_UNITS)
        .expect("frame should decode")
        .expect("one complete frame");
    assert_eq!(frame.text(), "GUI_LOG_8378|WARNING|battery low: 11.2V");
    assert!(wire.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_missing_socket_is_a_transport_error() {
    let dir = unique_temp_dir("missing");
    let output = westpipe()
        .arg("send")
        .arg(dir.join("nobody.sock"))
        .arg("--text")
        .arg("hello")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn conflicting_send_payloads_are_rejected() {
    let output = westpipe()
        .arg("send")
        .arg("/tmp/unused.sock")
        .arg("--text")
        .arg("a")
        .arg("--data")
        .arg("{}")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn version_names_the_binary() {
    let output = westpipe()
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("westpipe "));
}
