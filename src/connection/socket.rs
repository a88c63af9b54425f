// connection/socket.rs
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ConnectionManager;
use crate::{devices::DeviceEndpoint, error::AppError};

/// Drive one connection from handshake to close. Whatever ends the socket,
/// the manager's close handling runs exactly once at the end.
pub(super) async fn run(
    manager: ConnectionManager,
    endpoint: DeviceEndpoint,
    url: String,
    id: Uuid,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    let connection_error = |reason: String| AppError::Connection {
        url: url.clone(),
        reason,
    };

    match connect_async(url.as_str()).await {
        Ok((stream, _response)) => {
            manager.mark_open(&url, id);
            let (mut sender, mut receiver) = stream.split();

            loop {
                tokio::select! {
                    incoming = receiver.next() => match incoming {
                        Some(Ok(Message::Text(text))) => manager.handle_inbound_frame(&text),
                        Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => manager.handle_inbound_frame(text),
                            Err(e) => warn!(%url, error = %e, "Dropping non-UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            info!(%url, ?frame, "Connection closed by device");
                            break;
                        }
                        Some(Ok(other)) => debug!(%url, ?other, "Control frame"),
                        Some(Err(e)) => {
                            manager.report_error(&url, &connection_error(e.to_string()));
                            break;
                        }
                        None => {
                            debug!(%url, "Stream ended");
                            break;
                        }
                    },
                    Some(message) = outbound.recv() => {
                        let closing = matches!(message, Message::Close(_));
                        if let Err(e) = sender.send(message).await {
                            manager.report_error(&url, &connection_error(e.to_string()));
                            break;
                        }
                        if closing {
                            break;
                        }
                    }
                }
            }
        }
        Err(e) => manager.report_error(&url, &connection_error(e.to_string())),
    }

    manager.handle_close(&endpoint, &url, id);
}
