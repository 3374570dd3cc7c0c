//! Recommendation endpoints, over plain HTTP and over a WebSocket.

use ::axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use ::shardrank_common::{
    node::ProductId,
    serde::{Deserialize, Serialize},
    serde_json,
    tracing::{debug, info, warn},
};

use crate::{backend::RecommendationBackend, error::Result, state::GatewayState};

/// Reply to a WebSocket message that is not a [RecommendationRequest].
pub const INVALID_REQUEST: &str = "Invalid request format";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "shardrank_common::serde")]
pub struct RecommendationRequest {
    pub product_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "shardrank_common::serde")]
pub struct RecommendationResponse {
    pub recommendations: Vec<ProductId>,
}

async fn recommend<B: RecommendationBackend>(
    State(state): State<GatewayState<B>>,
    Json(body): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>> {
    let recommendations = state.get_backend().recommend(&body.product_name).await?;
    info!(
        "Recommend {} products for {}",
        recommendations.len(),
        body.product_name
    );
    Ok(Json(RecommendationResponse { recommendations }))
}

async fn websocket<B: RecommendationBackend>(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState<B>>,
) -> Response {
    ws.on_upgrade(move |socket| relay(socket, state))
}

/// Answer every text message until the client goes away.
async fn relay<B: RecommendationBackend>(mut socket: WebSocket, state: GatewayState<B>) {
    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(other) => {
                debug!("Ignore WebSocket message {:?}", other);
                continue;
            }
            Err(e) => {
                warn!("WebSocket read failed: {}", e);
                break;
            }
        };
        let reply = answer(state.get_backend(), &text).await;
        if let Err(e) = socket.send(Message::Text(reply)).await {
            warn!("WebSocket write failed: {}", e);
            break;
        }
    }
    debug!("WebSocket closed");
}

/// The reply to one WebSocket message.
/// Failures are answered with a plain text line and the socket stays open.
pub(crate) async fn answer<B: RecommendationBackend>(backend: &B, message: &str) -> String {
    let request: RecommendationRequest = match serde_json::from_str(message) {
        Ok(request) => request,
        Err(e) => {
            warn!("Invalid WebSocket request {:?}: {}", message, e);
            return INVALID_REQUEST.to_owned();
        }
    };
    match backend.recommend(&request.product_name).await {
        Ok(recommendations) => serde_json::to_string(&RecommendationResponse { recommendations })
            .unwrap_or_else(|e| format!("Cannot encode the response: {}", e)),
        Err(e) => {
            warn!("No recommendation for {}: {}", request.product_name, e);
            e.to_string()
        }
    }
}

pub(crate) fn get_recommendation_router<B: RecommendationBackend>() -> Router<GatewayState<B>> {
    Router::new()
        .route("/recommendations", post(recommend::<B>))
        .route("/ws", get(websocket::<B>))
}
