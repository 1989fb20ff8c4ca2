//! Reactive query results for pages rendered in preview mode.
//!
//! A non-preview page gets a fixed snapshot and never touches the network.
//! A preview page gets one background task per [`LiveQuery`] that listens
//! for mutations and refetches the query, publishing through a watch channel.

use crate::domain::source::{ContentSource, ListenEvent, QueryParams};
use crate::error::{ChannelError, ConfigError};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Snapshot of a live query.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveQueryState<T> {
    pub data: T,
    /// True until the listener handshake completes.
    pub loading: bool,
    /// Set once when the channel fails; the subscription is gone afterwards.
    pub error: Option<ChannelError>,
}

/// Handle to a live query. Dropping it stops the subscription.
#[derive(Debug)]
pub struct LiveQuery<T> {
    state: watch::Receiver<LiveQueryState<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Clone> LiveQuery<T> {
    /// A query that will never update: `loading` false, no error, no channel.
    pub fn fixed(data: T) -> Self {
        let (_tx, rx) = watch::channel(LiveQueryState {
            data,
            loading: false,
            error: None,
        });
        Self {
            state: rx,
            task: None,
        }
    }

    /// Whether a subscription channel was opened for this query.
    pub fn is_subscribed(&self) -> bool {
        self.task.is_some()
    }

    pub fn state(&self) -> LiveQueryState<T> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> T {
        self.state.borrow().data.clone()
    }

    /// Waits for the next update. Returns `false` once no more updates can arrive.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Opens the channel for `(query, params)` seeded with `initial`.
///
/// Fails with [`ConfigError::NoRuntime`] outside a Tokio runtime.
pub(crate) fn subscribe<C, T>(
    source: Arc<C>,
    query: String,
    params: QueryParams,
    initial: T,
) -> Result<LiveQuery<T>, ConfigError>
where
    C: ContentSource + 'static,
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
    let (tx, rx) = watch::channel(LiveQueryState {
        data: initial,
        loading: true,
        error: None,
    });
    let task = runtime.spawn(run(source, query, params, tx));
    Ok(LiveQuery {
        state: rx,
        task: Some(task),
    })
}

fn fail<T>(tx: &watch::Sender<LiveQueryState<T>>, error: ChannelError) {
    tracing::warn!(error = %error, "live query stopped");
    tx.send_modify(|state| {
        state.loading = false;
        state.error = Some(error);
    });
}

async fn refetch<C, T>(source: &C, query: &str, params: &QueryParams) -> Result<T, ChannelError>
where
    C: ContentSource,
    T: DeserializeOwned,
{
    let value = source
        .fetch(query, params)
        .await
        .map_err(|e| ChannelError::Refetch(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| ChannelError::Refetch(e.to_string()))
}

async fn run<C, T>(
    source: Arc<C>,
    query: String,
    params: QueryParams,
    tx: watch::Sender<LiveQueryState<T>>,
) where
    C: ContentSource + 'static,
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let mut events = match source.listen(&query, &params).await {
        Ok(events) => events,
        Err(e) => return fail(&tx, ChannelError::Connect(e.to_string())),
    };

    while let Some(event) = events.next().await {
        match event {
            Ok(ListenEvent::Welcome { listener_name }) => {
                tracing::debug!(listener = ?listener_name, "live query connected");
                tx.send_modify(|state| state.loading = false);
            }
            Ok(ListenEvent::Mutation { document_id, .. }) => {
                tracing::debug!(document_id = ?document_id, "mutation received, refetching");
                match refetch::<C, T>(&source, &query, &params).await {
                    Ok(data) => tx.send_modify(|state| {
                        state.data = data;
                        state.loading = false;
                    }),
                    Err(e) => return fail(&tx, e),
                }
            }
            Ok(ListenEvent::Reconnect) => {
                tracing::debug!("listener asked to reconnect");
            }
            Ok(ListenEvent::ChannelError { message }) => {
                return fail(&tx, ChannelError::Channel(message));
            }
            Ok(ListenEvent::Disconnect { reason }) => {
                return fail(&tx, ChannelError::Disconnected(reason));
            }
            Err(e) => return fail(&tx, ChannelError::Channel(e.to_string())),
        }

        if tx.is_closed() {
            return;
        }
    }

    fail(&tx, ChannelError::Closed);
}
