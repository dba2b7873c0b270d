//! Push notifications from the table API.

use futures::stream::{BoxStream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use super::{ChangeEvent, RemoteError, RemoteStore};
use crate::models::Bucket;

/// Opens the change feed of one table.
///
/// The stream ends when the server closes the connection. Frames that are
/// not change events are skipped.
pub async fn subscribe(
    remote: &RemoteStore,
    bucket: Bucket,
) -> Result<BoxStream<'static, ChangeEvent>, RemoteError> {
    let url = remote.realtime_url(bucket);
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| RemoteError::Network(e.to_string()))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", remote.api_key()))
        .map_err(|e| RemoteError::Network(e.to_string()))?;
    request.headers_mut().insert("Authorization", bearer);

    let (ws_stream, _) = connect_async(request)
        .await
        .map_err(|e| RemoteError::Network(e.to_string()))?;
    tracing::debug!("Subscribed to {} changes at {}", bucket, url);

    let (_sender, receiver) = ws_stream.split();
    let events = receiver
        .take_while(|frame| {
            let open = matches!(frame, Ok(msg) if !msg.is_close());
            async move { open }
        })
        .filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str(text.as_str()) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        tracing::warn!("Ignoring malformed change event: {}", e);
                        None
                    }
                },
                _ => None,
            }
        });

    Ok(events.boxed())
}
