use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, StreamExt};
use pulse_core::{DefaultAdapter, SourceAdapter, UpstreamClient};
use pulse_engine::{Cache, Gateway, Ingress, QuoteBatch};
use pulse_types::{CallerTag, Dashboard, RealtimeQuoteWire, StockCode};
use serde::{Deserialize, Serialize};

/// Shared state reachable from every `/stocks_realtime` connection.
#[derive(Clone)]
pub struct AppState {
    /// Front door onto the pool for `refresh_realtime_data` requests.
    pub ingress: Ingress,
    /// Realtime quote cache, read for the immediate post-refresh snapshot.
    pub cache: Arc<Cache>,
    /// Subscription fan-out the connection registers against.
    pub gateway: Arc<Gateway>,
    /// The `fast` client, invoked directly by `refresh_realtime_data` so a
    /// requested dashboard doesn't wait for the next scheduled tick.
    pub fast: Arc<dyn UpstreamClient>,
}

/// Inbound messages on the `/stocks_realtime` namespace.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WsInbound {
    RefreshRealtimeData { dashboards: Vec<Dashboard> },
}

/// Outbound messages on the `/stocks_realtime` namespace.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WsOutbound {
    RealtimeUpdate {
        data: BTreeMap<StockCode, RealtimeQuoteWire>,
    },
}

fn to_wire(batch: &QuoteBatch) -> BTreeMap<StockCode, RealtimeQuoteWire> {
    batch.iter().map(|&(code, quote)| (code, quote.into())).collect()
}

/// Upgrade an HTTP request to the `/stocks_realtime` WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, mut deltas_rx) = state.gateway.register(32);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_inbound(&text, &state, id).await {
                            tracing::debug!(client = %id, error = %e, "ignoring malformed inbound message");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(client = %id, error = %e, "websocket receive error, closing");
                        break;
                    }
                }
            }
            batch = deltas_rx.recv() => {
                match batch {
                    Some(batch) => {
                        if send_update(&mut sender, &batch).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
    state.gateway.unregister(id);
}

async fn handle_inbound(text: &str, state: &AppState, client_id: uuid::Uuid) -> Result<(), serde_json::Error> {
    let inbound: WsInbound = serde_json::from_str(text)?;
    match inbound {
        WsInbound::RefreshRealtimeData { dashboards } => {
            let mut codes = Vec::new();
            for dashboard in dashboards {
                codes.extend(state.ingress.codes_for_refresh(dashboard));
            }
            codes.sort_unstable();
            codes.dedup();
            state.ingress.enqueue(codes.iter().copied(), CallerTag::Refresh);

            if !codes.is_empty() {
                match state.fast.fetch(&codes).await {
                    Ok(readings) => {
                        let now = Instant::now();
                        let pairs: Vec<_> = readings
                            .into_iter()
                            .map(|reading| DefaultAdapter.normalize(reading, now))
                            .collect();
                        let deltas = state.cache.put_many(pairs);
                        if !deltas.is_empty() {
                            state.gateway.broadcast(&deltas);
                        }
                    }
                    Err(e) => {
                        tracing::debug!(client = %client_id, error = %e, "refresh fetch failed, serving stale cache");
                    }
                }
            }

            let snapshot: QuoteBatch = codes
                .into_iter()
                .filter_map(|code| state.cache.get(code).map(|quote| (code, quote)))
                .collect();
            if !snapshot.is_empty() {
                state.gateway.send_to(client_id, snapshot);
            }
        }
    }
    Ok(())
}

async fn send_update(
    sender: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
    batch: &QuoteBatch,
) -> Result<(), axum::Error> {
    let outbound = WsOutbound::RealtimeUpdate { data: to_wire(batch) };
    let payload = serde_json::to_string(&outbound).unwrap_or_else(|_| "{}".to_owned());
    sender.send(Message::Text(payload.into())).await
}
