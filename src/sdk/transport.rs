use crate::protocol::client_events::ClientEvent;
use crate::protocol::server_events::ServerEvent;
use crate::{RealtimeClient, Result};
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Event source and sink the console runs over.
pub trait Transport: Send {
    fn send(&mut self, event: ClientEvent) -> BoxFuture<'_, Result<()>>;
    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<ServerEvent>>>;
}

impl Transport for RealtimeClient {
    fn send(&mut self, event: ClientEvent) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { Self::send(self, event).await })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<ServerEvent>>> {
        Box::pin(async move { Self::next_event(self).await })
    }
}
