//! Network seam for page requests.
//!
//! `send` starts a request and hands back a cancel handle; the result comes
//! back later as a [`NetEvent`] fed to the navigator on the same event loop.

use serde::{Deserialize, Serialize};

use crate::envelope::{PageRequest, ResponseEnvelope};
use crate::scripts::BatchId;

/// Identifies one dispatched navigation request.
pub type RequestId = u64;

/// Abort capability for an outstanding request.
pub trait CancelHandle {
    /// Try to cancel. Returns `false` when the response is already past the
    /// point of no return; the caller must then let the old request win.
    fn abort(&mut self) -> bool;
}

pub trait Transport {
    fn send(&mut self, id: RequestId, request: &PageRequest) -> Box<dyn CancelHandle>;
}

/// Transport-level failure not represented in a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailure {
    /// Deliberate cancel. Not an error.
    Cancelled,
    /// No response: connection refused, DNS failure, truncated body.
    Network { text: String },
    /// The server answered with an error status. Code 0 is a host-side abort.
    Status { code: u16, text: String },
}

/// Completion events the host feeds back into the navigator.
#[derive(Debug, Clone)]
pub enum NetEvent {
    Response {
        id: RequestId,
        result: Result<ResponseEnvelope, TransportFailure>,
    },
    ScriptsLoaded {
        batch: BatchId,
    },
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use reqwest::header::CONTENT_TYPE;
    use tokio::sync::mpsc::UnboundedSender;
    use tokio::task::AbortHandle;

    use super::{CancelHandle, NetEvent, RequestId, Transport, TransportFailure};
    use crate::envelope::{Method, PageRequest, ResponseEnvelope};

    /// Page requests over HTTP. Each request runs on its own tokio task and
    /// reports back through `events`.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        base: url::Url,
        events: UnboundedSender<NetEvent>,
    }

    impl HttpTransport {
        pub fn new(base: url::Url, events: UnboundedSender<NetEvent>) -> Self {
            Self {
                client: reqwest::Client::new(),
                base,
                events,
            }
        }

        pub fn with_client(mut self, client: reqwest::Client) -> Self {
            self.client = client;
            self
        }
    }

    struct TaskCancel(AbortHandle);

    impl CancelHandle for TaskCancel {
        fn abort(&mut self) -> bool {
            if self.0.is_finished() {
                return false;
            }
            self.0.abort();
            true
        }
    }

    impl Transport for HttpTransport {
        fn send(&mut self, id: RequestId, request: &PageRequest) -> Box<dyn CancelHandle> {
            let client = self.client.clone();
            let events = self.events.clone();
            let base = self.base.clone();
            let request = request.clone();
            let task = tokio::spawn(async move {
                let result = fetch(&client, &base, &request).await;
                if events.send(NetEvent::Response { id, result }).is_err() {
                    tracing::debug!(id, "navigator gone; dropping response");
                }
            });
            Box::new(TaskCancel(task.abort_handle()))
        }
    }

    async fn fetch(
        client: &reqwest::Client,
        base: &url::Url,
        request: &PageRequest,
    ) -> Result<ResponseEnvelope, TransportFailure> {
        let builder = match request.method {
            Method::Get => {
                let url = base.join(&request.query_url()).map_err(network_failure)?;
                client.get(url)
            }
            Method::Post => {
                let url = base.join(&request.url).map_err(network_failure)?;
                client
                    .post(url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(request.params.clone())
            }
        };

        let response = builder.send().await.map_err(network_failure)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportFailure::Status {
                code: status.as_u16(),
                text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let body = response.text().await.map_err(network_failure)?;
        ResponseEnvelope::from_json(&body).map_err(|e| {
            tracing::warn!(error = %e, url = %request.url, "unparseable response envelope");
            TransportFailure::Status {
                code: status.as_u16(),
                text: "parsererror".to_string(),
            }
        })
    }

    fn network_failure(e: impl std::fmt::Display) -> TransportFailure {
        TransportFailure::Network { text: e.to_string() }
    }
}
