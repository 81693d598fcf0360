//! The cluster client: a connection to a silo, and typed proxies built on
//! top of it.
//!
//! Grounded on riker-patterns' `ask`: a call registers a oneshot under a
//! message id and a background receive loop completes it when the matching
//! reply frame arrives, rather than blocking the transport's read side on
//! one in-flight call at a time.

pub mod converters;
pub mod correlation;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::client::correlation::{with_retries, CorrelationMap, RetryPolicy};
use crate::config::ClientConfig;
use crate::error::{QuarkError, Result};
use crate::identity::{ActorIdentity, MessageIdGenerator};
use crate::message::Envelope;
use crate::transport::Transport;

/// A connection to one silo, handling correlation and retry for calls made
/// through any [`Proxy`] built on it.
pub struct ClusterClient {
    transport: Arc<dyn Transport>,
    connected: AtomicBool,
    correlation: Arc<CorrelationMap>,
    message_ids: MessageIdGenerator,
    retry_policy: RetryPolicy,
    recv_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ClusterClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Arc<Self> {
        Arc::new(ClusterClient {
            transport,
            connected: AtomicBool::new(false),
            correlation: Arc::new(CorrelationMap::new()),
            message_ids: MessageIdGenerator::with_prefix(config.client_id.clone()),
            retry_policy: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
            recv_task: tokio::sync::Mutex::new(None),
        })
    }

    /// Connects the client: spawns the background loop that reads replies
    /// off the transport and completes pending calls. Idempotent.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        if self.connected.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let transport = self.transport.clone();
        let correlation = self.correlation.clone();
        let handle = tokio::spawn(async move {
            loop {
                match transport.recv().await {
                    Ok(Some(envelope)) => correlation.complete(envelope),
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "transport recv failed");
                        break;
                    }
                }
            }
        });
        *self.recv_task.lock().await = Some(handle);
        Ok(())
    }

    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        if let Some(handle) = self.recv_task.lock().await.take() {
            handle.abort();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Calls `method` on `target`, retrying with backoff if `idempotent`.
    pub async fn call(&self, target: ActorIdentity, method: &str, args_blob: Vec<u8>, idempotent: bool) -> Result<Vec<u8>> {
        if !self.is_connected() {
            return Err(QuarkError::NotConnected);
        }

        with_retries(&self.retry_policy, idempotent, |_attempt| {
            let target = target.clone();
            let method = method.to_string();
            let args_blob = args_blob.clone();
            async move {
                let message_id = self.message_ids.next();
                let rx = self.correlation.register(message_id.clone());
                let envelope = Envelope::new(target.clone(), method, args_blob, message_id.clone());
                self.transport.send(envelope).await?;

                match tokio::time::timeout(Duration::from_secs(10), rx).await {
                    Ok(Ok(reply)) => Ok(reply.args_blob),
                    Ok(Err(_)) => {
                        self.correlation.cancel(&message_id);
                        Err(QuarkError::TransportFailed {
                            reason: "reply channel dropped".into(),
                        })
                    }
                    Err(_) => {
                        self.correlation.cancel(&message_id);
                        Err(QuarkError::DeadlineExceeded)
                    }
                }
            }
        })
        .await
    }
}

/// A location-transparent, typed handle to one actor, addressed by identity.
/// Encoding/decoding uses JSON so application code never touches envelope
/// bytes directly.
pub struct Proxy<T> {
    client: Arc<ClusterClient>,
    identity: ActorIdentity,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Proxy<T> {
    pub fn new(client: Arc<ClusterClient>, identity: ActorIdentity) -> Self {
        Proxy {
            client,
            identity,
            _marker: PhantomData,
        }
    }

    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }

    /// Invokes `method`, encoding `req` and decoding the response as JSON.
    /// `idempotent` governs whether a timed-out call is retried.
    pub async fn call<Req, Resp>(&self, method: &str, req: &Req, idempotent: bool) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let args_blob = serde_json::to_vec(req).map_err(|e| QuarkError::TransportFailed { reason: e.to_string() })?;
        let reply = self
            .client
            .call(self.identity.clone(), method, args_blob, idempotent)
            .await?;
        serde_json::from_slice(&reply).map_err(|e| QuarkError::TransportFailed { reason: e.to_string() })
    }
}

impl<T> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Proxy {
            client: self.client.clone(),
            identity: self.identity.clone(),
            _marker: PhantomData,
        }
    }
}
