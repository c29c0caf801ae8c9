//! RPC clients
// (c) 2025 Ross Younger

mod pool;

pub use pool::PoolClient;

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::codec::DynamicStruct;
use crate::error::{ApplicationError, ApplicationErrorKind, Error};
use crate::protocol::Protocol;
use crate::types::{TMessageHeader, TMessageType};

/// Executes one request/response exchange.
#[async_trait]
pub trait Client: Send + Sync {
    /// Invokes `method`, serializing `args` and (unless `result` is
    /// absent, which requests oneway semantics) deserializing the reply
    /// into `result`.
    ///
    /// Dropping the returned future cancels the exchange; a client
    /// cancelled mid-call must be discarded unless its transport supports
    /// reset.
    async fn call(
        &self,
        method: &str,
        args: &DynamicStruct,
        result: Option<&mut DynamicStruct>,
    ) -> Result<(), Error>;
}

/// The standard client: paired input/output protocols, serialized
/// exchanges, monotonically increasing sequence identities.
///
/// The internal mutex guarantees that CALL/REPLY pairs on one client are
/// strictly ordered; the protocols are never used concurrently.
#[derive(Debug)]
pub struct StandardClient<I: Protocol, O: Protocol> {
    state: Mutex<State<I, O>>,
    sequence: Arc<AtomicI32>,
}

#[derive(Debug)]
struct State<I, O> {
    input: I,
    output: O,
}

impl<I: Protocol, O: Protocol> StandardClient<I, O> {
    /// Creates a client over an input and an output protocol. The two may
    /// share a transport; the client owns both exclusively.
    #[must_use]
    pub fn new(input: I, output: O) -> Self {
        Self {
            state: Mutex::new(State { input, output }),
            sequence: Arc::new(AtomicI32::new(0)),
        }
    }

    /// Replaces the identity counter with a shared, externally-sequenced
    /// one. Used by [`PoolClient`] so identities stay unique across a
    /// pool.
    #[must_use]
    pub fn with_sequence(mut self, sequence: Arc<AtomicI32>) -> Self {
        self.sequence = sequence;
        self
    }

    fn next_identity(&self) -> i32 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl<I: Protocol, O: Protocol> Client for StandardClient<I, O> {
    async fn call(
        &self,
        method: &str,
        args: &DynamicStruct,
        result: Option<&mut DynamicStruct>,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let identity = self.next_identity();
        tracing::trace!(method, identity, "call");
        let header = TMessageHeader {
            name: method.to_string(),
            message_type: TMessageType::Call,
            identity,
        };
        state.output.write_message_begin(&header)?;
        args.write(&mut state.output)?;
        state.output.write_message_end()?;
        state.output.flush().await?;

        let Some(result) = result else {
            // oneway semantics: nothing further to read
            return Ok(());
        };

        let reply = state.input.read_message_begin()?;
        if reply.name != method {
            return Err(ApplicationError::new(
                ApplicationErrorKind::WrongMethodName,
                format!("{method}: wrong method name"),
            )
            .into());
        }
        if reply.identity != identity {
            return Err(ApplicationError::new(
                ApplicationErrorKind::BadSequenceId,
                format!("{method}: out of order sequence response"),
            )
            .into());
        }
        match reply.message_type {
            TMessageType::Exception => {
                let e = ApplicationError::read(&mut state.input)?;
                state.input.read_message_end()?;
                tracing::trace!(method, identity, kind = %e.kind, "exception reply");
                Err(e.into())
            }
            TMessageType::Reply => {
                result.read(&mut state.input)?;
                state.input.read_message_end()?;
                tracing::trace!(method, identity, "reply");
                Ok(())
            }
            _ => Err(ApplicationError::new(
                ApplicationErrorKind::InvalidMessageType,
                format!("{method}: invalid message type"),
            )
            .into()),
        }
    }
}
