use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    config::Config,
    hub::{HubHandle, InputParcel},
    proto::{self, ErrorOutput, Output},
    state::ConnId,
};

pub fn router() -> Router {
    Router::new().route("/session", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(hub): Extension<HubHandle>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse {
    ws.max_message_size(config.max_frame_bytes)
        .on_upgrade(move |sock| client_ws(sock, hub))
}

/* ---------------- per connection ---------------- */
async fn client_ws(sock: WebSocket, hub: HubHandle) {
    let conn = ConnId::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<Output>();
    if hub.send(InputParcel::Connect { conn, sender: tx.clone() }).is_err() {
        return;
    }

    let (mut sink, mut stream) = sock.split();
    let writer = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&out) else { continue };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(raw) => match proto::parse_frame(&raw) {
                Ok((ack, input)) => {
                    if hub.send(InputParcel::Input { conn, ack, input }).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!(%conn, %err, "bad frame");
                    tx.send(Output::Error(ErrorOutput { message: err.to_string() })).ok();
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    hub.send(InputParcel::Disconnect { conn }).ok();
    writer.abort();
}
