use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

use super::protocol::{
    DeleteRequest, ENDPOINT_DATA, GetRequest, Origin, PostRequest, Reply, ReplyBody,
};
use crate::node::PhysicalNode;

/// Sends a request to another node's data endpoint and hands back its status
/// and body.
///
/// `Err` means no response was obtained at all (connection refused, timeout);
/// any HTTP status is an `Ok`, whatever its body.
#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    async fn get(
        &self,
        node: &PhysicalNode,
        request: &GetRequest,
        origin: Origin,
    ) -> Result<Reply>;

    async fn post(
        &self,
        node: &PhysicalNode,
        request: &PostRequest,
        origin: Origin,
    ) -> Result<Reply>;

    async fn delete(
        &self,
        node: &PhysicalNode,
        request: &DeleteRequest,
        origin: Origin,
    ) -> Result<Reply>;
}

/// [`PeerClient`] speaking JSON over HTTP with `reqwest`.
pub struct HttpPeerClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn send<T: Serialize + Sync>(
        &self,
        method: Method,
        node: &PhysicalNode,
        payload: &T,
        origin: Origin,
    ) -> Result<Reply> {
        let mut url = format!("{}{}", node.url(), ENDPOINT_DATA);
        if let Some(query) = origin.query() {
            url.push('?');
            url.push_str(&query);
        }

        let response = self
            .http_client
            .request(method.clone(), url)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = StatusCode::from_u16(response.status().as_u16())?;
        let bytes = response.bytes().await?;
        let body = ReplyBody::from_bytes(&bytes);

        tracing::debug!("{} {} ({:?}) -> {}", method, node, origin, status);
        Ok(Reply { status, body })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn get(
        &self,
        node: &PhysicalNode,
        request: &GetRequest,
        origin: Origin,
    ) -> Result<Reply> {
        self.send(Method::GET, node, request, origin).await
    }

    async fn post(
        &self,
        node: &PhysicalNode,
        request: &PostRequest,
        origin: Origin,
    ) -> Result<Reply> {
        self.send(Method::POST, node, request, origin).await
    }

    async fn delete(
        &self,
        node: &PhysicalNode,
        request: &DeleteRequest,
        origin: Origin,
    ) -> Result<Reply> {
        self.send(Method::DELETE, node, request, origin).await
    }
}
