//! Device transport backed by an external helper program.
//!
//! The helper receives `--device-id <id>` on its command line and the firmware
//! context as JSON on stdin. Each stdout line of the form
//! `{"progress": 0.4, "displayedOnDevice": false}` becomes a progress event;
//! anything else is logged. Exit status 0 completes the stream.

use super::{FirmwarePrepareRequest, FirmwareTransport};
use crate::subscription::{spawn_stream, EventSink, FirmwarePrepareEvent, Subscription};
use fwup_core::TransportConfig;
use fwup_error::TransportError;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::Duration;
use wait_timeout::ChildExt;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CommandTransport {
    program: String,
    args: Vec<String>,
}

impl CommandTransport {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(cfg: &TransportConfig) -> Self {
        Self::new(cfg.program.clone(), cfg.args.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl FirmwareTransport for CommandTransport {
    fn firmware_prepare(&self, request: &FirmwarePrepareRequest) -> Subscription {
        let program = self.program.clone();
        let mut args = self.args.clone();
        args.push("--device-id".to_string());
        args.push(request.device_id.clone());
        let payload = serde_json::to_string(&request.firmware);

        log::info!(
            "Starting {} for device {:?}",
            program,
            request.device_id
        );

        spawn_stream("firmware-prepare", move |sink| match payload {
            Ok(payload) => run_helper(&program, &args, &payload, sink),
            Err(e) => sink.error(TransportError::Protocol(format!(
                "cannot encode firmware context: {}",
                e
            ))),
        })
    }
}

/// Parse one helper output line as a progress event.
pub fn parse_progress_line(line: &str) -> Option<FirmwarePrepareEvent> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    serde_json::from_str(line).ok()
}

fn run_helper(program: &str, args: &[String], payload: &str, sink: EventSink) {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            log::error!("Failed to start {}: {}", program, e);
            sink.error(TransportError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            });
            return;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        // Dropping stdin closes it so the helper sees EOF.
        if let Err(e) = stdin.write_all(payload.as_bytes()) {
            log::debug!("{}: could not write firmware context: {}", program, e);
        }
    }

    // Drain stderr in the background so a chatty helper cannot block on it.
    let mut stderr_handle = child.stderr.take().map(|stderr| {
        std::thread::spawn(move || {
            let mut raw = Vec::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_end(&mut raw);
            String::from_utf8_lossy(&raw).into_owned()
        })
    });

    let (tx, rx) = mpsc::channel::<io::Result<String>>();
    if let Some(stdout) = child.stdout.take() {
        std::thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let line = match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    // Helper output is not guaranteed to be UTF-8.
                    Ok(_) => Ok(String::from_utf8_lossy(&buf).into_owned()),
                    Err(e) => Err(e),
                };
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        });
    }

    loop {
        if sink.is_cancelled() {
            log::info!("{}: cancelled, stopping helper", program);
            stop_child(&mut child);
            return;
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(line)) => match parse_progress_line(&line) {
                Some(event) => {
                    if !sink.next(event) {
                        stop_child(&mut child);
                        return;
                    }
                }
                None => log::debug!("{}: {}", program, line.trim_end()),
            },
            Ok(Err(e)) => {
                stop_child(&mut child);
                sink.error(TransportError::Protocol(format!(
                    "reading {} output: {}",
                    program, e
                )));
                return;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    // stdout is closed; wait for the exit status without ignoring cancellation.
    let status = match wait_for_exit(&mut child, &sink) {
        Ok(Some(status)) => status,
        Ok(None) => {
            stop_child(&mut child);
            return;
        }
        Err(e) => {
            stop_child(&mut child);
            sink.error(TransportError::Protocol(format!(
                "waiting for {}: {}",
                program, e
            )));
            return;
        }
    };

    let stderr = stderr_handle
        .take()
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    if status.success() {
        log::info!("{}: firmware prepared", program);
        sink.complete();
    } else {
        log::error!("{} exited with {:?}", program, status.code());
        sink.error(TransportError::CommandFailed {
            program: program.to_string(),
            code: status.code(),
            stderr: stderr.trim().to_string(),
        });
    }
}

/// `Ok(None)` means the consumer released the stream while waiting.
fn wait_for_exit(child: &mut Child, sink: &EventSink) -> io::Result<Option<ExitStatus>> {
    loop {
        if sink.is_cancelled() {
            return Ok(None);
        }
        if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
            return Ok(Some(status));
        }
    }
}

/// Kill and reap the helper. The stderr drain thread is left to finish on its
/// own: a grandchild may still hold the pipe open.
fn stop_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::StreamMessage;
    use fwup_core::FirmwareUpdateContext;

    const WAIT: Duration = Duration::from_secs(10);

    fn drain(sub: &mut Subscription) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        while let Some(msg) = sub.next_timeout(WAIT) {
            let terminal = msg.is_terminal();
            out.push(msg);
            if terminal {
                break;
            }
        }
        out
    }

    fn request(device_id: &str) -> FirmwarePrepareRequest {
        FirmwarePrepareRequest::new(device_id, FirmwareUpdateContext::default())
    }

    #[test]
    fn parses_progress_lines() {
        assert_eq!(
            parse_progress_line(r#"  {"progress": 0.75, "displayedOnDevice": true}  "#),
            Some(FirmwarePrepareEvent::new(0.75, true))
        );
        assert_eq!(parse_progress_line("connecting to device..."), None);
        assert_eq!(parse_progress_line(r#"{"status": "busy"}"#), None);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let transport = CommandTransport::new("/nonexistent/fwup-helper", Vec::new());
        let mut sub = transport.firmware_prepare(&FirmwarePrepareRequest::new(
            "usb-1",
            FirmwareUpdateContext::default(),
        ));
        match drain(&mut sub).as_slice() {
            [StreamMessage::Error(TransportError::Spawn { program, .. })] => {
                assert_eq!(program, "/nonexistent/fwup-helper");
            }
            other => panic!("unexpected messages: {:?}", other),
        }
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CommandTransport {
        CommandTransport::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "fwup-helper".to_string()],
        )
    }

    #[cfg(unix)]
    #[test]
    fn streams_progress_then_completes() {
        let transport = shell(
            r#"cat > /dev/null
echo "opening channel"
echo '{"progress": 0.5, "displayedOnDevice": false}'
echo '{"progress": 1.0, "displayedOnDevice": true}'
"#,
        );
        let mut sub = transport.firmware_prepare(&request("usb-1"));

        assert_eq!(
            drain(&mut sub),
            vec![
                StreamMessage::Next(FirmwarePrepareEvent::new(0.5, false)),
                StreamMessage::Next(FirmwarePrepareEvent::new(1.0, true)),
                StreamMessage::Complete,
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_output_is_logged_not_fatal() {
        let transport = shell(
            r#"cat > /dev/null
printf 'log \377\n'
echo '{"progress": 1.0, "displayedOnDevice": true}'
"#,
        );
        let mut sub = transport.firmware_prepare(&request("usb-1"));

        assert_eq!(
            drain(&mut sub),
            vec![
                StreamMessage::Next(FirmwarePrepareEvent::new(1.0, true)),
                StreamMessage::Complete,
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn passes_device_id_argument() {
        // $1 is "--device-id", $2 the id.
        let transport = shell(
            r#"cat > /dev/null
[ "$1" = "--device-id" ] && [ "$2" = "usb-7" ] || exit 3
"#,
        );
        let mut sub = transport.firmware_prepare(&request("usb-7"));
        assert_eq!(drain(&mut sub), vec![StreamMessage::Complete]);
    }

    #[cfg(unix)]
    #[test]
    fn firmware_context_is_written_to_stdin() {
        let transport = shell(r#"grep -q '"shouldFlashMCU":true' || exit 4"#);
        let ctx = FirmwareUpdateContext {
            should_flash_mcu: true,
            ..FirmwareUpdateContext::default()
        };
        let mut sub = transport.firmware_prepare(&FirmwarePrepareRequest::new("usb-1", ctx));
        assert_eq!(drain(&mut sub), vec![StreamMessage::Complete]);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_command_failed() {
        let transport = shell(
            r#"cat > /dev/null
echo "device unplugged" >&2
exit 2
"#,
        );
        let mut sub = transport.firmware_prepare(&request("usb-1"));
        match drain(&mut sub).as_slice() {
            [StreamMessage::Error(TransportError::CommandFailed { code, stderr, .. })] => {
                assert_eq!(*code, Some(2));
                assert_eq!(stderr, "device unplugged");
            }
            other => panic!("unexpected messages: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn unsubscribe_stops_a_hung_helper() {
        let transport = shell(
            r#"echo '{"progress": 0.1, "displayedOnDevice": false}'
sleep 30
"#,
        );
        let mut sub = transport.firmware_prepare(&request("usb-1"));
        assert!(matches!(sub.next_timeout(WAIT), Some(StreamMessage::Next(_))));
        sub.unsubscribe();
        assert!(sub.is_closed());
        assert_eq!(sub.try_next(), None);
    }
}
