use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use super::client::PeerClient;
use super::protocol::{
    DeleteRequest, ENDPOINT_DATA, ENDPOINT_HEALTH, ENDPOINT_NODES, GetRequest, HealthResponse,
    NodesResponse, Origin, PostRequest, Reply, ReplyBody, RequestParams,
};
use super::service::Coordinator;
use crate::node::PhysicalNode;

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            Some(ReplyBody::Json(body)) => (self.status, Json(body)).into_response(),
            Some(ReplyBody::Text(text)) => (self.status, text).into_response(),
            None => self.status.into_response(),
        }
    }
}

pub async fn handle_get<C: PeerClient>(
    Extension(coordinator): Extension<Arc<Coordinator<C>>>,
    Query(params): Query<RequestParams>,
    Json(req): Json<GetRequest>,
) -> Reply {
    let origin = Origin::from(params);
    let span = tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = "GET",
        key = %req.key,
        origin = ?origin
    );
    coordinator.get(req, origin).instrument(span).await
}

pub async fn handle_post<C: PeerClient>(
    Extension(coordinator): Extension<Arc<Coordinator<C>>>,
    Query(params): Query<RequestParams>,
    Json(req): Json<PostRequest>,
) -> Reply {
    let origin = Origin::from(params);
    let span = tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = "POST",
        key = %req.key,
        origin = ?origin
    );
    coordinator.post(req, origin).instrument(span).await
}

pub async fn handle_delete<C: PeerClient>(
    Extension(coordinator): Extension<Arc<Coordinator<C>>>,
    Query(params): Query<RequestParams>,
    Json(req): Json<DeleteRequest>,
) -> Reply {
    let origin = Origin::from(params);
    let span = tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = "DELETE",
        key = %req.key,
        origin = ?origin
    );
    coordinator.delete(req, origin).instrument(span).await
}

pub async fn handle_health<C: PeerClient>(
    Extension(coordinator): Extension<Arc<Coordinator<C>>>,
) -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(coordinator.health()))
}

pub async fn handle_add_node<C: PeerClient>(
    Extension(coordinator): Extension<Arc<Coordinator<C>>>,
    Json(node): Json<PhysicalNode>,
) -> (StatusCode, Json<NodesResponse>) {
    let changed = coordinator.add_node(node);
    let status = if changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(NodesResponse {
            changed,
            nodes: coordinator.nodes(),
        }),
    )
}

pub async fn handle_remove_node<C: PeerClient>(
    Extension(coordinator): Extension<Arc<Coordinator<C>>>,
    Json(node): Json<PhysicalNode>,
) -> (StatusCode, Json<NodesResponse>) {
    let changed = coordinator.remove_node(&node);
    let status = if changed {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (
        status,
        Json(NodesResponse {
            changed,
            nodes: coordinator.nodes(),
        }),
    )
}

/// HTTP surface of a node. `PUT /` is an alias of `POST /`.
pub fn router<C: PeerClient>(coordinator: Arc<Coordinator<C>>) -> Router {
    Router::new()
        .route(
            ENDPOINT_DATA,
            get(handle_get::<C>)
                .post(handle_post::<C>)
                .put(handle_post::<C>)
                .delete(handle_delete::<C>),
        )
        .route(ENDPOINT_HEALTH, get(handle_health::<C>))
        .route(
            ENDPOINT_NODES,
            post(handle_add_node::<C>).delete(handle_remove_node::<C>),
        )
        .layer(Extension(coordinator))
        .layer(TraceLayer::new_for_http())
}
