use std::time::Duration;

use picolink_boot::FlagStore;
use picolink_frame::{FrameConfig, FrameError, Framed};
use picolink_transport::Channel;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{DispatchError, Result};
use crate::message::{Request, RequestKind, Response, ERROR_EXC};

/// Pause after a swallowed fault before the next iteration.
pub const DEFAULT_FAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Firmware version reported by `ping` and `get_status`.
    pub version: String,
    /// Pause after a swallowed fault.
    pub fault_backoff: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            fault_backoff: DEFAULT_FAULT_BACKOFF,
        }
    }
}

/// What handling one request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send this response.
    Respond(Response),
    /// Send nothing; the flag is armed and the device must soft reboot.
    Reboot,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A request was answered.
    Responded,
    /// A frame with a bad length header was discarded without a response.
    Dropped,
    /// The peer hung up; a partly read frame was discarded unanswered.
    PeerReset,
    /// `enter_maintenance` was handled; the run must end in a soft reboot.
    Reboot,
}

/// Why [`Dispatcher::serve`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Soft reboot requested; boot selection runs again.
    Reboot,
    /// The channel can never deliver data again.
    ChannelClosed,
}

/// Counters for the serving loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Complete frames read.
    pub frames: u64,
    /// Responses written.
    pub responses: u64,
    /// Frames discarded for a bad length header.
    pub dropped: u64,
    /// Faults swallowed at the loop boundary.
    pub faults: u64,
    /// Peers that hung up.
    pub resets: u64,
}

/// Serves framed requests over a single channel.
pub struct Dispatcher<C, D, F> {
    framed: Framed<C>,
    device: D,
    flag: F,
    config: DispatchConfig,
    stats: DispatchStats,
}

impl<C, D, F> Dispatcher<C, D, F>
where
    C: Channel,
    D: Device,
    F: FlagStore,
{
    /// Create a dispatcher with default framing.
    pub fn new(channel: C, device: D, flag: F, config: DispatchConfig) -> Self {
        Self::with_frame_config(channel, device, flag, config, FrameConfig::default())
    }

    /// Create a dispatcher with explicit framing configuration.
    pub fn with_frame_config(
        channel: C,
        device: D,
        flag: F,
        config: DispatchConfig,
        frame_config: FrameConfig,
    ) -> Self {
        Self {
            framed: Framed::with_config(channel, frame_config),
            device,
            flag,
            config,
            stats: DispatchStats::default(),
        }
    }

    /// Serve requests until a soft reboot is requested or the channel closes.
    ///
    /// A single bad request never ends the loop: faults are counted, answered
    /// with a best-effort `EXC` error and followed by a short pause.
    pub fn serve(&mut self) -> Exit {
        info!(
            channel = self.framed.get_ref().name(),
            version = %self.config.version,
            "serving requests"
        );
        loop {
            match self.step() {
                Ok(Step::Reboot) => {
                    info!(stats = ?self.stats, "soft reboot requested");
                    return Exit::Reboot;
                }
                Ok(Step::Responded | Step::Dropped | Step::PeerReset) => {}
                Err(err) if err.is_closed() => {
                    info!(stats = ?self.stats, "channel closed");
                    return Exit::ChannelClosed;
                }
                Err(err) => self.recover(err),
            }
        }
    }

    /// Read, interpret and answer exactly one frame.
    pub fn step(&mut self) -> Result<Step> {
        let payload = match self.framed.read_frame() {
            Ok(payload) => payload,
            Err(err @ FrameError::BadLength { .. }) => {
                self.stats.dropped += 1;
                warn!(error = %err, "discarding frame header");
                return Ok(Step::Dropped);
            }
            Err(err) if err.is_peer_reset() => {
                self.stats.resets += 1;
                info!(error = %err, "peer reset; waiting for the next request");
                return Ok(Step::PeerReset);
            }
            Err(err) => return Err(DispatchError::Read(err)),
        };
        self.stats.frames += 1;

        let request = Request::parse(&payload);
        debug!(kind = ?request.kind, len = payload.len(), "request received");

        match self.handle(request)? {
            Reply::Respond(response) => {
                self.respond(&response)?;
                Ok(Step::Responded)
            }
            Reply::Reboot => Ok(Step::Reboot),
        }
    }

    /// Compute the reply to one request.
    pub fn handle(&mut self, request: Request) -> Result<Reply> {
        let response = match request.kind {
            RequestKind::Ping => Response::Pong {
                ts: self.device.uptime_ms(),
                version: self.config.version.clone(),
            },
            RequestKind::GetStatus => {
                self.device.collect();
                Response::Status {
                    uptime_ms: self.device.uptime_ms(),
                    heap_free: self.device.heap_free(),
                    version: self.config.version.clone(),
                }
            }
            RequestKind::Echo => Response::Echo { data: request.data },
            RequestKind::EnterMaintenance => {
                self.flag.arm()?;
                return Ok(Reply::Reboot);
            }
            RequestKind::Unknown(kind) => Response::unknown_command(&kind),
        };
        Ok(Reply::Respond(response))
    }

    /// Encode and write one response.
    pub fn respond(&mut self, response: &Response) -> Result<()> {
        let payload = serde_json::to_vec(response).map_err(DispatchError::Encode)?;
        self.framed.send(&payload).map_err(DispatchError::Write)?;
        self.stats.responses += 1;
        Ok(())
    }

    fn recover(&mut self, err: DispatchError) {
        self.stats.faults += 1;
        warn!(error = %err, faults = self.stats.faults, "request failed");
        let reply = Response::error(ERROR_EXC, err.to_string());
        if let Err(send_err) = self.respond(&reply) {
            debug!(error = %send_err, "error response not delivered");
        }
        std::thread::sleep(self.config.fault_backoff);
    }

    /// Loop counters so far.
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Borrow the framed channel.
    pub fn framed(&self) -> &Framed<C> {
        &self.framed
    }

    /// Give back the channel, device and flag store.
    pub fn into_parts(self) -> (C, D, F) {
        (self.framed.into_inner(), self.device, self.flag)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    use bytes::{BufMut, BytesMut};
    use picolink_boot::BootError;
    use picolink_frame::{decode_frame, encode, MAX_FRAME_BYTES};
    use picolink_transport::TransportError;
    use serde_json::{json, Value};

    use super::*;
    use crate::message::ERROR_UNKNOWN_CMD;

    /// Scripted channel: queued input chunks, captured output, optional
    /// write failures. An exhausted input reports a closed channel.
    #[derive(Default)]
    struct Wire {
        input: VecDeque<Vec<u8>>,
        output: Vec<u8>,
        failing_writes: usize,
    }

    impl Wire {
        fn with_frames(frames: &[Value]) -> Self {
            let mut wire = Self::default();
            for frame in frames {
                wire.push_payload(&serde_json::to_vec(frame).unwrap());
            }
            wire
        }

        fn push_payload(&mut self, payload: &[u8]) {
            self.input.push_back(encode(payload).unwrap().to_vec());
        }

        fn push_raw(&mut self, bytes: &[u8]) {
            self.input.push_back(bytes.to_vec());
        }

        fn responses(&self) -> Vec<Value> {
            let mut buf = BytesMut::from(self.output.as_slice());
            let mut out = Vec::new();
            while let Some(frame) = decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap() {
                out.push(serde_json::from_slice(&frame).unwrap());
            }
            assert!(buf.is_empty(), "trailing partial frame in output");
            out
        }
    }

    impl Channel for Wire {
        fn name(&self) -> &'static str {
            "wire"
        }

        fn read(&mut self, buf: &mut [u8]) -> picolink_transport::Result<usize> {
            let Some(mut chunk) = self.input.pop_front() else {
                return Err(TransportError::Closed);
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.input.push_front(chunk.split_off(n));
            }
            Ok(n)
        }

        fn write(&mut self, data: &[u8]) -> picolink_transport::Result<()> {
            if self.failing_writes > 0 {
                self.failing_writes -= 1;
                return Err(TransportError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            self.output.extend_from_slice(data);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDevice {
        clock: Cell<u64>,
        collections: usize,
    }

    impl Device for FakeDevice {
        fn uptime_ms(&self) -> u64 {
            let now = self.clock.get() + 5;
            self.clock.set(now);
            now
        }

        fn heap_free(&self) -> u64 {
            180_000
        }

        fn collect(&mut self) {
            self.collections += 1;
        }
    }

    #[derive(Default)]
    struct MemoryFlag {
        armed: Cell<bool>,
        broken: bool,
    }

    impl FlagStore for MemoryFlag {
        fn is_armed(&self) -> picolink_boot::Result<bool> {
            Ok(self.armed.get())
        }

        fn arm(&self) -> picolink_boot::Result<()> {
            if self.broken {
                return Err(BootError::Flag {
                    path: PathBuf::from("MAINTENANCE"),
                    source: std::io::Error::other("read-only filesystem"),
                });
            }
            self.armed.set(true);
            Ok(())
        }

        fn clear(&self) -> picolink_boot::Result<()> {
            self.armed.set(false);
            Ok(())
        }
    }

    fn config() -> DispatchConfig {
        DispatchConfig {
            version: "1.2.3".to_string(),
            fault_backoff: Duration::ZERO,
        }
    }

    fn dispatcher(wire: &mut Wire) -> Dispatcher<&mut Wire, FakeDevice, MemoryFlag> {
        dispatcher_with_flag(wire, MemoryFlag::default())
    }

    fn dispatcher_with_flag(
        wire: &mut Wire,
        flag: MemoryFlag,
    ) -> Dispatcher<&mut Wire, FakeDevice, MemoryFlag> {
        let frame_config = FrameConfig {
            backoff: Duration::ZERO,
            ..FrameConfig::default()
        };
        Dispatcher::with_frame_config(wire, FakeDevice::default(), flag, config(), frame_config)
    }

    #[test]
    fn ping_answers_pong() {
        let mut wire = Wire::with_frames(&[json!({"type": "ping"})]);
        assert_eq!(dispatcher(&mut wire).serve(), Exit::ChannelClosed);

        let responses = wire.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["type"], "pong");
        assert_eq!(responses[0]["version"], "1.2.3");
        assert!(responses[0]["ts"].is_u64());
    }

    #[test]
    fn pong_timestamps_do_not_decrease() {
        let mut wire = Wire::with_frames(&[json!({"type": "ping"}), json!({"type": "ping"})]);
        dispatcher(&mut wire).serve();

        let responses = wire.responses();
        let first = responses[0]["ts"].as_u64().unwrap();
        let second = responses[1]["ts"].as_u64().unwrap();
        assert!(second >= first);
    }

    #[test]
    fn echo_returns_data_exactly() {
        let mut wire = Wire::with_frames(&[json!({"type": "echo", "data": "hi"})]);
        dispatcher(&mut wire).serve();
        assert_eq!(wire.responses(), vec![json!({"type": "echo", "data": "hi"})]);
    }

    #[test]
    fn echo_without_data_returns_null() {
        let mut wire = Wire::with_frames(&[json!({"type": "echo"})]);
        dispatcher(&mut wire).serve();
        assert_eq!(wire.responses(), vec![json!({"type": "echo", "data": null})]);
    }

    #[test]
    fn status_runs_reclamation_first() {
        let mut wire = Wire::with_frames(&[json!({"type": "get_status"})]);
        let mut d = dispatcher(&mut wire);
        d.serve();
        let (_, device, _) = d.into_parts();
        assert_eq!(device.collections, 1);

        let responses = wire.responses();
        assert_eq!(responses[0]["type"], "status");
        assert_eq!(responses[0]["heap_free"], 180_000);
        assert_eq!(responses[0]["version"], "1.2.3");
        assert!(responses[0]["uptime_ms"].is_u64());
    }

    #[test]
    fn unknown_type_is_unknown_cmd() {
        let mut wire = Wire::with_frames(&[json!({"type": "frobnicate"})]);
        dispatcher(&mut wire).serve();
        assert_eq!(
            wire.responses(),
            vec![json!({
                "type": "error",
                "code": ERROR_UNKNOWN_CMD,
                "message": "Unknown command: frobnicate"
            })]
        );
    }

    #[test]
    fn malformed_payload_answered_and_fully_consumed() {
        let mut wire = Wire::default();
        wire.push_payload(b"{\"type\": \"pi");
        wire.push_payload(br#"{"type":"ping"}"#);
        dispatcher(&mut wire).serve();

        let responses = wire.responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["code"], ERROR_UNKNOWN_CMD);
        assert_eq!(responses[0]["message"], "Unknown command: null");
        assert_eq!(responses[1]["type"], "pong");
    }

    #[test]
    fn bad_header_then_ping_yields_one_pong() {
        let mut wire = Wire::default();
        wire.push_raw(&0u32.to_be_bytes());
        wire.push_payload(br#"{"type":"ping"}"#);

        let mut d = dispatcher(&mut wire);
        assert_eq!(d.serve(), Exit::ChannelClosed);
        assert_eq!(d.stats().dropped, 1);
        assert_eq!(d.stats().responses, 1);

        let responses = wire.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["type"], "pong");
    }

    #[test]
    fn oversized_header_is_not_read_as_payload() {
        let mut header = BytesMut::new();
        header.put_u32((MAX_FRAME_BYTES + 1) as u32);
        let mut wire = Wire::default();
        wire.push_raw(&header);
        wire.push_payload(br#"{"type":"echo","data":1}"#);

        let mut d = dispatcher(&mut wire);
        assert_eq!(d.step().unwrap(), Step::Dropped);
        assert_eq!(d.step().unwrap(), Step::Responded);
        assert_eq!(wire.responses(), vec![json!({"type": "echo", "data": 1})]);
    }

    #[test]
    fn enter_maintenance_arms_flag_without_response() {
        let mut wire = Wire::with_frames(&[
            json!({"type": "enter_maintenance"}),
            json!({"type": "ping"}),
        ]);
        let mut d = dispatcher(&mut wire);
        assert_eq!(d.serve(), Exit::Reboot);
        let (_, _, flag) = d.into_parts();

        assert!(flag.armed.get());
        assert!(wire.responses().is_empty());
        // The request after the reboot trigger is left for the next run.
        assert_eq!(wire.input.len(), 1);
    }

    #[test]
    fn flag_failure_is_reported_and_serving_continues() {
        let mut wire = Wire::with_frames(&[
            json!({"type": "enter_maintenance"}),
            json!({"type": "ping"}),
        ]);
        let flag = MemoryFlag {
            broken: true,
            ..MemoryFlag::default()
        };
        let mut d = dispatcher_with_flag(&mut wire, flag);
        assert_eq!(d.serve(), Exit::ChannelClosed);
        assert_eq!(d.stats().faults, 1);

        let responses = wire.responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["type"], "error");
        assert_eq!(responses[0]["code"], ERROR_EXC);
        assert!(responses[0]["message"]
            .as_str()
            .unwrap()
            .contains("read-only filesystem"));
        assert_eq!(responses[1]["type"], "pong");
    }

    #[test]
    fn write_fault_answered_with_exc() {
        let mut wire = Wire::with_frames(&[json!({"type": "ping"})]);
        wire.failing_writes = 1;

        let mut d = dispatcher(&mut wire);
        d.serve();
        assert_eq!(d.stats().faults, 1);

        let responses = wire.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["code"], ERROR_EXC);
        assert!(responses[0]["message"]
            .as_str()
            .unwrap()
            .starts_with("write failed"));
    }

    #[test]
    fn undeliverable_error_is_swallowed() {
        let mut wire = Wire::with_frames(&[json!({"type": "ping"}), json!({"type": "ping"})]);
        wire.failing_writes = 2;

        let mut d = dispatcher(&mut wire);
        assert_eq!(d.serve(), Exit::ChannelClosed);
        assert_eq!(d.stats().faults, 1);

        let responses = wire.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["type"], "pong");
    }

    #[test]
    fn repeated_status_does_not_disturb_later_requests() {
        let mut frames = vec![json!({"type": "get_status"}); 5];
        frames.push(json!({"type": "ping"}));
        frames.push(json!({"type": "echo", "data": [1, 2]}));
        let mut wire = Wire::with_frames(&frames);
        dispatcher(&mut wire).serve();

        let responses = wire.responses();
        assert_eq!(responses.len(), 7);
        assert!(responses[..5].iter().all(|r| r["type"] == "status"));
        assert_eq!(responses[5]["type"], "pong");
        assert_eq!(responses[6], json!({"type": "echo", "data": [1, 2]}));
    }

    #[test]
    fn responses_follow_request_order() {
        let mut wire = Wire::with_frames(&[
            json!({"type": "echo", "data": 1}),
            json!({"type": "nope"}),
            json!({"type": "echo", "data": 2}),
        ]);
        dispatcher(&mut wire).serve();

        let kinds: Vec<Value> = wire.responses().iter().map(|r| r["type"].clone()).collect();
        assert_eq!(kinds, vec![json!("echo"), json!("error"), json!("echo")]);
    }
}
