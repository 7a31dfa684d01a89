//! HTTP client for the Marathon API.

use std::time::Duration;

use bytes::BytesMut;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{MarathonError, MarathonResult};
use crate::sse::{EventParser, StreamEvent};
use crate::types::{AppDefinition, DeployResponse};

const MEDIA_TYPE_EVENT_STREAM: &str = "text/event-stream";

/// Client for a single Marathon instance.
///
/// The request timeout applies to `deploy_app` calls only; the event stream
/// is expected to stay open indefinitely and is bounded by its stop token
/// instead.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl Client {
    /// Creates a client for the given base URL.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> MarathonResult<Self> {
        let http = reqwest::Client::builder().build().map_err(MarathonError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            request_timeout,
        })
    }

    /// Submits an app definition, returning the Marathon deployment that
    /// tracks the rollout. Any 2xx response is accepted.
    pub async fn deploy_app(&self, app: &AppDefinition) -> MarathonResult<DeployResponse> {
        if app.id.is_empty() {
            return Err(MarathonError::MissingAppId);
        }
        let url = format!("{}/v2/apps", self.base_url);
        debug!(app_id = %app.id, url = %url, "submitting app definition");
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(app)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MarathonError::UnexpectedStatus {
                status: response.status(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    /// Streams server-sent events into `events` until the server closes the
    /// connection, a framing error occurs, or `stop` is cancelled.
    ///
    /// Cancellation and a dropped receiver both terminate the stream
    /// cleanly with `Ok(())`.
    pub async fn stream_events(
        &self,
        events: mpsc::Sender<StreamEvent>,
        stop: CancellationToken,
    ) -> MarathonResult<()> {
        let url = format!("{}/v2/events", self.base_url);
        debug!(url = %url, "opening event stream");
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, MEDIA_TYPE_EVENT_STREAM)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MarathonError::UnexpectedStatus {
                status: response.status(),
                url,
            });
        }

        let mut body = response.bytes_stream();
        let mut parser = EventParser::new();
        let mut buffer = BytesMut::new();
        loop {
            tokio::select! {
                () = stop.cancelled() => {
                    debug!("event stream stopped");
                    return Ok(());
                }
                chunk = body.next() => {
                    let Some(chunk) = chunk else {
                        debug!("event stream closed by server");
                        return Ok(());
                    };
                    buffer.extend_from_slice(&chunk?);
                    while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                        let line = buffer.split_to(newline + 1);
                        let line = std::str::from_utf8(&line[..line.len() - 1])
                            .map_err(|e| MarathonError::protocol(format!(
                                "event stream is not valid UTF-8: {e}"
                            )))?;
                        if let Some(event) = parser.feed_line(line)? {
                            if events.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }
}
