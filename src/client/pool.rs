//! A pool of standard clients
// (c) 2025 Ross Younger

use std::sync::Arc;
use std::sync::atomic::AtomicI32;

use async_trait::async_trait;

use crate::client::{Client, StandardClient};
use crate::codec::DynamicStruct;
use crate::error::Error;
use crate::protocol::Protocol;

/// Multiplexes calls over a pool of [`StandardClient`]s.
///
/// A call checks a client out of the pool (creating one through the
/// factory if none is idle), runs the exchange, and returns the client on
/// success. A failed call invalidates its client: it is dropped, never
/// returned to the pool. There are no retries.
///
/// All pooled clients share one externally-sequenced identity counter, so
/// identities stay unique across the pool.
pub struct PoolClient<F, I, O>
where
    F: Fn() -> Result<StandardClient<I, O>, Error> + Send + Sync,
    I: Protocol,
    O: Protocol,
{
    factory: F,
    idle: tokio::sync::Mutex<Vec<StandardClient<I, O>>>,
    sequence: Arc<AtomicI32>,
}

impl<F, I, O> PoolClient<F, I, O>
where
    F: Fn() -> Result<StandardClient<I, O>, Error> + Send + Sync,
    I: Protocol,
    O: Protocol,
{
    /// Creates an empty pool; clients are minted on demand by `factory`.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            idle: tokio::sync::Mutex::new(Vec::new()),
            sequence: Arc::new(AtomicI32::new(0)),
        }
    }

    /// Number of idle clients currently pooled
    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }

    async fn check_out(&self) -> Result<StandardClient<I, O>, Error> {
        if let Some(client) = self.idle.lock().await.pop() {
            return Ok(client);
        }
        tracing::debug!("pool empty, creating a client");
        Ok((self.factory)()?.with_sequence(Arc::clone(&self.sequence)))
    }
}

impl<F, I, O> std::fmt::Debug for PoolClient<F, I, O>
where
    F: Fn() -> Result<StandardClient<I, O>, Error> + Send + Sync,
    I: Protocol,
    O: Protocol,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, I, O> Client for PoolClient<F, I, O>
where
    F: Fn() -> Result<StandardClient<I, O>, Error> + Send + Sync,
    I: Protocol,
    O: Protocol,
{
    async fn call(
        &self,
        method: &str,
        args: &DynamicStruct,
        result: Option<&mut DynamicStruct>,
    ) -> Result<(), Error> {
        let client = self.check_out().await?;
        match client.call(method, args, result).await {
            Ok(()) => {
                self.idle.lock().await.push(client);
                Ok(())
            }
            Err(e) => {
                // mid-call failure leaves the protocols in an unknown
                // state; the client is discarded
                tracing::debug!(method, "discarding failed pooled client");
                drop(client);
                Err(e)
            }
        }
    }
}
