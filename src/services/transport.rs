use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use serde_json::Value;

use super::error::TransportError;

pub type TransportBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Body handed back by a transport: either already fully read, or a chunk reader.
pub enum ResponseBody {
    Buffered(String),
    Streaming(ChunkStream),
}

impl ResponseBody {
    pub fn streaming<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        ResponseBody::Streaming(stream.boxed())
    }

    /// Reads the remaining body as lossy text.
    pub async fn into_text(self) -> Result<String, TransportError> {
        match self {
            ResponseBody::Buffered(text) => Ok(text),
            ResponseBody::Streaming(stream) => {
                let parts: Vec<Bytes> = stream.try_collect().await?;
                let bytes = parts.concat();
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

pub struct TransportResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait ChatTransport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: &'a Value,
    ) -> TransportBoxFuture<'a, Result<TransportResponse, TransportError>>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ChatTransport for ReqwestTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: &'a Value,
    ) -> TransportBoxFuture<'a, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            let resp = self.client.post(url).json(body).send().await?;
            let status = resp.status().as_u16();
            let stream = resp.bytes_stream().map_err(TransportError::from);
            Ok(TransportResponse {
                status,
                body: ResponseBody::streaming(stream),
            })
        })
    }
}
