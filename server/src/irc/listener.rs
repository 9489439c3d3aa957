use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::UserId;

use super::connection::{ConnectionLimits, handle_connection};
use super::dispatcher::DispatcherHandle;
use super::formatter::Formatter;

/// Hands out connection ids in increasing order until the id space runs out.
#[derive(Debug)]
struct IdAllocator {
    next: Option<UserId>,
}

impl IdAllocator {
    fn starting_at(first: UserId) -> Self {
        Self { next: Some(first) }
    }

    fn allocate(&mut self) -> Option<UserId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(id)
    }
}

/// Accept connections on an already bound listener and spawn a handler task
/// for each. Connection ids count up from zero and are never reused.
/// Stops accepting new connections when the cancellation token is triggered.
pub async fn start_irc_listener(
    listener: TcpListener,
    dispatcher: DispatcherHandle,
    formatter: Arc<Formatter>,
    limits: ConnectionLimits,
    cancel: CancellationToken,
) {
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "listener started"),
        Err(e) => info!(error = %e, "listener started (address unknown)"),
    }

    let mut ids = IdAllocator::starting_at(0);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("listener shutting down");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let Some(id) = ids.allocate() else {
                            error!(%addr, "connection ids exhausted, no longer accepting");
                            break;
                        };
                        let dispatcher = dispatcher.clone();
                        let formatter = formatter.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, id, addr.to_string(), dispatcher, formatter, limits).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_count_up_from_zero() {
        let mut ids = IdAllocator::starting_at(0);
        assert_eq!(ids.allocate(), Some(0));
        assert_eq!(ids.allocate(), Some(1));
        assert_eq!(ids.allocate(), Some(2));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut ids = IdAllocator::starting_at(UserId::MAX - 1);
        assert_eq!(ids.allocate(), Some(UserId::MAX - 1));
        assert_eq!(ids.allocate(), Some(UserId::MAX));
        assert_eq!(ids.allocate(), None);
        assert_eq!(ids.allocate(), None);
    }
}
