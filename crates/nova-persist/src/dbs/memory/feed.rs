use futures::StreamExt;
use nova_types::ChangeEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::trait_client::ChangeStream;

#[derive(Debug, Clone)]
struct Envelope<T> {
    owner: String,
    /// Thread the row belongs to, for thread-scoped subscriptions
    scope: Option<String>,
    event: ChangeEvent<T>,
}

/// Fan-out of change events to subscribers, filtered by owner and scope
pub(crate) struct ChangeFeed<T> {
    tx: broadcast::Sender<Envelope<T>>,
}

impl<T> ChangeFeed<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub(crate) fn publish(&self, owner: &str, scope: Option<&str>, event: ChangeEvent<T>) {
        // No receivers is fine: nobody is listening yet
        let _ = self.tx.send(Envelope {
            owner: owner.to_string(),
            scope: scope.map(str::to_string),
            event,
        });
    }

    pub(crate) fn subscribe(&self, owner: &str, scope: Option<&str>) -> ChangeStream<T> {
        let owner = owner.to_string();
        let scope = scope.map(str::to_string);

        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(move |item| {
            let matches = match &item {
                Ok(envelope) => {
                    envelope.owner == owner && (scope.is_none() || envelope.scope == scope)
                }
                Err(_) => false,
            };
            async move {
                match item {
                    Ok(envelope) if matches => Some(envelope.event),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Change feed subscriber lagged, events dropped");
                        None
                    }
                }
            }
        });

        Box::pin(stream)
    }
}
