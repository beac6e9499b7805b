//! JSON-lines event stream
//!
//! Each line on stdin is one inbound event, each line on stdout one
//! outbound command or observer event, both shaped as
//! `{"event": <name>, "payload": <value>}`.

use crate::error::BridgeError;
use rov_autopilot::{InboundMessage, OutboundMessage};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, Mutex};

/// Parse one inbound line
pub fn decode_inbound(line: &str) -> Result<InboundMessage, BridgeError> {
    serde_json::from_str(line.trim()).map_err(|e| BridgeError::decode(line, e))
}

/// Render one outbound message without the trailing newline
pub fn encode_outbound(message: &OutboundMessage) -> Result<String, BridgeError> {
    serde_json::to_string(message).map_err(|e| BridgeError::Encode(e.to_string()))
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Line-oriented writer shared by the vehicle port and the event forwarder.
/// Whole lines are written under the lock so output never interleaves.
pub struct LineSink {
    writer: Mutex<BoxedWriter>,
}

impl LineSink {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<(), BridgeError> {
        let mut line = encode_outbound(message)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        writer.shutdown().await?;
        Ok(())
    }
}

/// Copy observer events from the engine to the sink until the engine stops.
///
/// Commands are skipped here; they reach the sink through the vehicle port.
pub async fn forward_events(mut rx: broadcast::Receiver<OutboundMessage>, sink: &LineSink) {
    loop {
        match rx.recv().await {
            Ok(message @ OutboundMessage::Event(_)) => {
                if let Err(e) = sink.send(&message).await {
                    tracing::error!("Failed to write event: {}", e);
                }
            }
            Ok(OutboundMessage::Command(_)) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event stream lagged, {} messages dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rov_autopilot::{EngineEvent, TaskStatus, VehicleCommand};
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_decode_route_start() {
        let msg = decode_inbound(r#"{"event":"route-start","payload":[{"type":"frw","value":"5"}]}"#).unwrap();
        assert_eq!(msg.name(), "route-start");

        let msg = decode_inbound("  {\"event\":\"route-abort\"}\n").unwrap();
        assert_eq!(msg, InboundMessage::RouteAbort);
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        let err = decode_inbound(r#"{"event":"self-destruct"}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
        assert!(err.is_recoverable());

        assert!(decode_inbound("not json").is_err());
    }

    #[test]
    fn test_encode_outbound() {
        let line = encode_outbound(&OutboundMessage::Event(EngineEvent::TaskState {
            state: TaskStatus::Running,
            index: 2,
        }))
        .unwrap();
        assert_eq!(line, r#"{"event":"task-state","payload":{"state":"running","index":2}}"#);
    }

    #[tokio::test]
    async fn test_sink_writes_one_line_per_message() {
        let (client, mut server) = tokio::io::duplex(4096);
        let sink = LineSink::new(client);

        sink.send(&VehicleCommand::AllStop.into()).await.unwrap();
        sink.send(&EngineEvent::RouteCompleted.into()).await.unwrap();
        sink.shutdown().await.unwrap();

        let mut output = String::new();
        server.read_to_string(&mut output).await.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![r#"{"event":"motor.all-stop"}"#, r#"{"event":"route-completed"}"#]
        );
    }
}
