//! HTTP client transport
// (c) 2025 Ross Younger

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::config::Configuration;
use crate::error::{TransportError, TransportErrorKind};
use crate::transport::{Transport, TransportFactory};

const THRIFT_CONTENT_TYPE: &str = "application/x-thrift";

/// A transport that POSTs each accumulated request to a URL.
///
/// Writes append to an in-memory request buffer. [`flush`](Transport::flush)
/// drops any unread remainder of the previous response, POSTs the buffer
/// with `Content-Type: application/x-thrift` and retains the (fully
/// downloaded) response body for subsequent reads. A non-200 status
/// surfaces as a [`TransportError`] carrying the status code.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: reqwest::Url,
    headers: HeaderMap,
    request: BytesMut,
    response: Bytes,
}

impl HttpTransport {
    /// Creates a transport POSTing to `url`.
    pub fn new(url: &str, cfg: Option<Configuration>) -> Result<Self, TransportError> {
        Self::with_client(url, cfg, reqwest::Client::new())
    }

    /// Creates a transport POSTing to `url` through a caller-supplied client
    /// (connection pools, proxies, TLS configuration).
    pub fn with_client(
        url: &str,
        cfg: Option<Configuration>,
        client: reqwest::Client,
    ) -> Result<Self, TransportError> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| TransportError::new(TransportErrorKind::Unknown, e.to_string()))?;
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static(THRIFT_CONTENT_TYPE));
        Ok(Self {
            client,
            url,
            headers,
            request: BytesMut::with_capacity(Configuration::resolve(cfg).max_buffer_size),
            response: Bytes::new(),
        })
    }

    /// Adds a header sent with every request.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        let _ = self.headers.insert(name, value);
    }

    /// Removes a previously added header.
    pub fn remove_header(&mut self, name: &HeaderName) {
        let _ = self.headers.remove(name);
    }

    /// The headers sent with every request.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = self.response.len().min(buf.len());
        self.response.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        self.request.put_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.response = Bytes::new();
        let body = self.request.split().freeze();
        tracing::debug!(url = %self.url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::new(
                TransportErrorKind::Unknown,
                format!("HTTP status code: {status}"),
            ));
        }
        // The whole body is downloaded here, so it is always drained
        // before the next exchange begins.
        self.response = response.bytes().await.map_err(classify)?;
        Ok(())
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else {
        TransportErrorKind::Unknown
    };
    TransportError::new(kind, e.to_string())
}

/// Mints [`HttpTransport`]s for a fixed URL.
#[derive(Clone, Debug)]
pub struct HttpTransportFactory {
    url: String,
    cfg: Option<Configuration>,
    client: reqwest::Client,
}

impl HttpTransportFactory {
    /// Creates a factory for the given URL. The underlying client (and its
    /// connection pool) is shared by every transport minted.
    #[must_use]
    pub fn new(url: impl Into<String>, cfg: Option<Configuration>) -> Self {
        Self {
            url: url.into(),
            cfg,
            client: reqwest::Client::new(),
        }
    }
}

impl TransportFactory for HttpTransportFactory {
    type Output = HttpTransport;

    fn transport(&self) -> Result<HttpTransport, TransportError> {
        HttpTransport::with_client(&self.url, self.cfg, self.client.clone())
    }
}
