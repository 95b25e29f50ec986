//! Command handling infrastructure.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use common::AggregateId;
use event_store::Version;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::publisher::DomainEventPublisher;
use crate::repository::{Repository, RepositoryError};

/// Re-load-and-retry attempts after a stale-version save.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 2;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated, stored and published.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// Handler for executing commands against aggregates.
///
/// One command is one unit of work:
/// 1. Load the aggregate from the repository
/// 2. Execute the command to produce events
/// 3. Apply the events and bump the version
/// 4. Save with the version that was read; on a conflict, start over
/// 5. Publish the events synchronously; on failure, revert the save
///
/// Units of work on the same aggregate run one at a time, and loads through
/// the handler wait for the one in flight. A save that is later reverted is
/// never observed through the handler.
pub struct CommandHandler<R, A>
where
    R: Repository<A>,
    A: Aggregate,
{
    repository: R,
    publisher: Arc<DomainEventPublisher<A::Event>>,
    max_conflict_retries: u32,
    locks: AggregateLocks,
    _phantom: PhantomData<A>,
}

/// One async lock per aggregate with a unit of work in flight.
#[derive(Default)]
struct AggregateLocks {
    held: Mutex<HashMap<AggregateId, Arc<Mutex<()>>>>,
}

impl AggregateLocks {
    async fn acquire(&self, aggregate_id: AggregateId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut held = self.held.lock().await;
            held.retain(|_, lock| Arc::strong_count(lock) > 1);
            held.entry(aggregate_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

impl<R, A> CommandHandler<R, A>
where
    R: Repository<A>,
    A: Aggregate + Clone,
{
    /// Creates a new command handler.
    pub fn new(repository: R, publisher: Arc<DomainEventPublisher<A::Event>>) -> Self {
        Self {
            repository,
            publisher,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            locks: AggregateLocks::default(),
            _phantom: PhantomData,
        }
    }

    /// Sets how many times a conflicting save is retried before surfacing.
    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let _guard = self.locks.acquire(aggregate_id).await;
        Ok(self.repository.find_by_id(aggregate_id).await?)
    }

    /// Loads an aggregate that must exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.load(aggregate_id)
            .await?
            .ok_or_else(|| not_found::<A>(aggregate_id))
    }

    /// Executes a creation command.
    ///
    /// The command runs against a blank aggregate when nothing is stored
    /// under `aggregate_id`, and against the stored one otherwise.
    pub async fn create<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.run(aggregate_id, true, command_fn).await
    }

    /// Executes a command against an existing aggregate.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error. It may be called more
    /// than once when a concurrent writer wins the save.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.run(aggregate_id, false, command_fn).await
    }

    async fn run<F>(
        &self,
        aggregate_id: AggregateId,
        allow_create: bool,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let _guard = self.locks.acquire(aggregate_id).await;
        let mut attempt = 0;

        loop {
            let stored = self.repository.find_by_id(aggregate_id).await?;
            let mut aggregate = match &stored {
                Some(aggregate) => aggregate.clone(),
                None if allow_create => A::default(),
                None => return Err(not_found::<A>(aggregate_id)),
            };
            let current_version = aggregate.version();

            // Execute command to get events
            let events = command_fn(&aggregate)?;

            if events.is_empty() {
                return Ok(CommandResult {
                    aggregate,
                    events: vec![],
                    new_version: current_version,
                });
            }

            let new_version = Version::new(current_version.as_i64() + events.len() as i64);
            aggregate.apply_events(events.iter().cloned());
            aggregate.set_version(new_version);

            match self.repository.save(&aggregate, current_version).await {
                Ok(()) => {}
                Err(RepositoryError::ConcurrencyConflict { .. })
                    if attempt < self.max_conflict_retries =>
                {
                    attempt += 1;
                    tracing::warn!(
                        aggregate_type = A::aggregate_type(),
                        aggregate_id = %aggregate_id,
                        attempt,
                        "Concurrent modification, reloading"
                    );
                    continue;
                }
                Err(error) => return Err(error.into()),
            }

            if let Err(error) = self.publisher.publish_all(&events).await {
                tracing::warn!(
                    aggregate_type = A::aggregate_type(),
                    aggregate_id = %aggregate_id,
                    error = %error,
                    "Event publication failed, reverting save"
                );
                if let Err(revert_error) = self
                    .repository
                    .revert(aggregate_id, stored.as_ref(), new_version)
                    .await
                {
                    tracing::error!(
                        aggregate_id = %aggregate_id,
                        error = %revert_error,
                        "Failed to revert save after publication failure"
                    );
                }
                return Err(error.into());
            }

            return Ok(CommandResult {
                aggregate,
                events,
                new_version,
            });
        }
    }
}

fn not_found<A: Aggregate>(aggregate_id: AggregateId) -> DomainError {
    DomainError::AggregateNotFound {
        aggregate_type: A::aggregate_type(),
        aggregate_id: aggregate_id.to_string(),
    }
}
