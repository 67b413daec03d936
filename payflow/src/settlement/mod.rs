//! Timer-driven settlement of transfers.
//!
//! Each scheduled transfer gets its own task that sleeps through the fixed
//! delays and advances the record one step at a time. The final step draws
//! the outcome from the injected [`RandomSource`].

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    core::random::RandomSource,
    domain::prelude::*,
    store::{StoreError, TransactionStore},
};

/// Delays and odds of the simulated settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementConfig {
    /// `PENDING_GATEWAY -> GATEWAY_SUCCESSFUL`
    pub gateway_delay: Duration,
    /// `GATEWAY_SUCCESSFUL -> PROCESSING_SETTLEMENT`
    pub settlement_delay: Duration,
    /// `PROCESSING_SETTLEMENT -> COMPLETED | FAILED_SETTLEMENT`
    pub completion_delay: Duration,
    /// Probability that settlement ends in `COMPLETED`.
    pub success_rate: f64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            gateway_delay: Duration::from_secs(2),
            settlement_delay: Duration::from_secs(3),
            completion_delay: Duration::from_secs(5),
            success_rate: 0.8,
        }
    }
}

/// What happens when a step's delay elapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Move to a fixed status.
    Advance(TransactionStatus),
    /// Draw the settlement outcome.
    Settle,
}

impl SettlementConfig {
    /// The next timed step out of `status`, if the simulation has one.
    pub fn next_step(&self, status: TransactionStatus) -> Option<(Duration, Step)> {
        use TransactionStatus::*;

        match status {
            PendingGateway => Some((self.gateway_delay, Step::Advance(GatewaySuccessful))),
            GatewaySuccessful => Some((self.settlement_delay, Step::Advance(ProcessingSettlement))),
            ProcessingSettlement => Some((self.completion_delay, Step::Settle)),
            Completed | FailedSettlement | CanceledGateway => None,
        }
    }
}

/// Weighted draw of the settlement outcome.
pub fn settle(random: &dyn RandomSource, success_rate: f64) -> TransactionStatus {
    if random.chance(success_rate) {
        TransactionStatus::Completed
    } else {
        TransactionStatus::FailedSettlement
    }
}

/// Settlement tasks by transaction id, tagged with the generation that
/// spawned them.
type Pending = Arc<Mutex<HashMap<String, (u64, JoinHandle<()>)>>>;

/// Schedules and tracks the settlement task of every transfer in flight.
pub struct Simulator {
    store: Arc<TransactionStore>,
    random: Arc<dyn RandomSource>,
    config: SettlementConfig,
    pending: Pending,
    generation: AtomicU64,
}

impl Simulator {
    pub fn new(
        store: Arc<TransactionStore>,
        random: Arc<dyn RandomSource>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            store,
            random,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Starts settling `transaction` from its current status.
    ///
    /// Terminal transactions are ignored. Scheduling an id that already has
    /// a task replaces (and aborts) the previous one.
    pub fn schedule(&self, transaction: &Transaction) {
        if transaction.status.is_terminal() {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        // registered before the task can finish and unregister itself
        let mut pending = self.lock_pending();
        let task = tokio::spawn(drive(
            self.store.clone(),
            self.random.clone(),
            self.config.clone(),
            transaction.id.clone(),
            transaction.status,
            (self.pending.clone(), generation),
        ));
        if let Some((_, previous)) = pending.insert(transaction.id.clone(), (generation, task)) {
            previous.abort();
        }
        drop(pending);

        debug!(id = %transaction.id, from = %transaction.status, "settlement scheduled");
    }

    /// Cancels a transfer that is still waiting on the gateway.
    ///
    /// The status check and the move to `CANCELED_GATEWAY` are one store
    /// step. The settlement task is aborted only once that move succeeded;
    /// a refused cancel leaves the running settlement alone.
    pub async fn cancel(&self, id: &str) -> Result<Transaction, StoreError> {
        let canceled = self
            .store
            .advance_from(
                id,
                TransactionStatus::PendingGateway,
                TransactionStatus::CanceledGateway,
            )
            .await?;

        if let Some((_, task)) = self.lock_pending().remove(id) {
            task.abort();
        }
        info!(id, "settlement canceled");
        Ok(canceled)
    }

    /// Aborts every settlement still in flight. Returns how many were live.
    pub fn abort_all(&self) -> usize {
        let drained: Vec<_> = self.lock_pending().drain().collect();
        let mut live = 0;
        for (_, (_, task)) in drained {
            if !task.is_finished() {
                live += 1;
            }
            task.abort();
        }
        if live > 0 {
            info!(aborted = live, "pending settlements aborted");
        }
        live
    }

    /// Number of settlements still running.
    pub fn in_flight(&self) -> usize {
        self.lock_pending()
            .values()
            .filter(|(_, handle)| !handle.is_finished())
            .count()
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, (u64, JoinHandle<()>)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Body of one settlement task.
async fn drive(
    store: Arc<TransactionStore>,
    random: Arc<dyn RandomSource>,
    config: SettlementConfig,
    id: String,
    mut status: TransactionStatus,
    (pending, generation): (Pending, u64),
) {
    while let Some((delay, step)) = config.next_step(status) {
        tokio::time::sleep(delay).await;

        let next = match step {
            Step::Advance(next) => next,
            Step::Settle => settle(random.as_ref(), config.success_rate),
        };
        match store.advance(&id, next).await {
            Ok(transaction) => status = transaction.status,
            Err(err) => {
                warn!(id = %id, error = %err, "settlement abandoned");
                break;
            }
        }
    }

    if status.is_terminal() {
        info!(id = %id, status = %status, "settlement finished");
    }
    // a newer schedule for the same id owns the slot now
    let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
    if pending.get(&id).is_some_and(|(owner, _)| *owner == generation) {
        pending.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            clock::MonotonicClock,
            random::{ScriptedRandom, SeededRandom},
        },
        store::{InMemoryRepository, TransactionRepository},
        stream::transactions::TransactionEvents,
    };
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use rust_decimal::Decimal;
    use TransactionStatus::*;

    fn simulator(random: Arc<dyn RandomSource>) -> (Arc<TransactionStore>, Simulator) {
        simulator_over(Arc::new(InMemoryRepository::default()), random)
    }

    fn simulator_over(
        repo: Arc<dyn TransactionRepository>,
        random: Arc<dyn RandomSource>,
    ) -> (Arc<TransactionStore>, Simulator) {
        let store = Arc::new(TransactionStore::new(
            repo,
            Arc::new(MonotonicClock::new()),
            TransactionEvents::new(64),
        ));
        let simulator = Simulator::new(store.clone(), random, SettlementConfig::default());
        (store, simulator)
    }

    /// In-memory records whose next lookup, once armed, stalls for 500ms
    /// after reading.
    #[derive(Default)]
    struct StallingReads {
        records: InMemoryRepository,
        armed: AtomicBool,
    }

    impl StallingReads {
        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TransactionRepository for StallingReads {
        async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
            let found = self.records.get(id).await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(found)
        }

        async fn list(&self) -> Result<Vec<Transaction>, StoreError> {
            self.records.list().await
        }

        async fn upsert(&self, transaction: Transaction) -> Result<(), StoreError> {
            self.records.upsert(transaction).await
        }

        async fn clear(&self) -> Result<(), StoreError> {
            self.records.clear().await
        }
    }

    fn transfer() -> NewTransfer {
        NewTransfer {
            amount: Some(Decimal::from(100)),
            recipient_phone: Some("+254712345678".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn steps_follow_the_fixed_sequence() {
        let config = SettlementConfig::default();
        assert_eq!(
            config.next_step(PendingGateway),
            Some((Duration::from_secs(2), Step::Advance(GatewaySuccessful)))
        );
        assert_eq!(
            config.next_step(GatewaySuccessful),
            Some((Duration::from_secs(3), Step::Advance(ProcessingSettlement)))
        );
        assert_eq!(
            config.next_step(ProcessingSettlement),
            Some((Duration::from_secs(5), Step::Settle))
        );
        for terminal in [Completed, FailedSettlement, CanceledGateway] {
            assert_eq!(config.next_step(terminal), None);
        }
    }

    #[test]
    fn settlement_draw_converges_to_success_rate() {
        let random = SeededRandom::new(2024);
        let trials = 1_000;
        let completed = (0..trials)
            .filter(|_| settle(&random, 0.8) == Completed)
            .count();
        let ratio = completed as f64 / trials as f64;
        assert!((ratio - 0.8).abs() < 0.05, "ratio {ratio}");
    }

    #[test]
    fn scripted_draws_pick_each_branch() {
        let random = ScriptedRandom::new([0.79, 0.8]);
        assert_eq!(settle(&random, 0.8), Completed);
        assert_eq!(settle(&random, 0.8), FailedSettlement);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion_on_virtual_time() {
        let (store, simulator) = simulator(Arc::new(ScriptedRandom::new([0.1])));
        let created = store.create(transfer()).await.unwrap();
        let mut rx = store.events().subscribe();
        simulator.schedule(&created);

        let mut seen = vec![created.clone()];
        while !seen.last().unwrap().status.is_terminal() {
            seen.push(rx.recv().await.unwrap());
        }

        let statuses: Vec<_> = seen.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![PendingGateway, GatewaySuccessful, ProcessingSettlement, Completed]
        );
        let gaps: Vec<_> = seen
            .windows(2)
            .map(|w| (w[1].updated_at - w[0].updated_at).num_seconds())
            .collect();
        assert_eq!(gaps, vec![2, 3, 5]);
        assert!(seen.last().unwrap().mpesa_transaction_id.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_draw_ends_in_failed_settlement() {
        let (store, simulator) = simulator(Arc::new(ScriptedRandom::new([0.95])));
        let created = store.create(transfer()).await.unwrap();
        simulator.schedule(&created);

        tokio::time::sleep(Duration::from_secs(11)).await;
        let done = store.read(&created.id).await.unwrap();
        assert_eq!(done.status, FailedSettlement);
        assert!(done.mpesa_transaction_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_from_an_intermediate_status() {
        let (store, simulator) = simulator(Arc::new(ScriptedRandom::new([0.0])));
        let created = store.create(transfer()).await.unwrap();
        let moved = store.advance(&created.id, GatewaySuccessful).await.unwrap();
        simulator.schedule(&moved);

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(store.read(&created.id).await.unwrap().status, ProcessingSettlement);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.read(&created.id).await.unwrap().status, Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_timer() {
        let (store, simulator) = simulator(Arc::new(ScriptedRandom::new([0.1])));
        let created = store.create(transfer()).await.unwrap();
        simulator.schedule(&created);
        assert_eq!(simulator.in_flight(), 1);

        let canceled = simulator.cancel(&created.id).await.unwrap();
        assert_eq!(canceled.status, CanceledGateway);
        assert_eq!(simulator.in_flight(), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.read(&created.id).await.unwrap().status, CanceledGateway);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_refused_once_the_gateway_succeeded() {
        let (store, simulator) = simulator(Arc::new(ScriptedRandom::new([0.1])));
        let created = store.create(transfer()).await.unwrap();
        simulator.schedule(&created);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let err = simulator.cancel(&created.id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition { from: GatewaySuccessful, .. }
        ));
        assert!(matches!(
            simulator.cancel("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_straddling_the_gateway_step_wins_cleanly() {
        let repo = Arc::new(StallingReads::default());
        let (store, simulator) =
            simulator_over(repo.clone(), Arc::new(ScriptedRandom::new([0.1])));
        let created = store.create(transfer()).await.unwrap();
        simulator.schedule(&created);

        // cancel reads PENDING_GATEWAY at 1.8s and writes at 2.3s; the timer
        // fires at 2.0s in between
        tokio::time::sleep(Duration::from_millis(1800)).await;
        repo.arm();
        let canceled = simulator.cancel(&created.id).await.unwrap();
        assert_eq!(canceled.status, CanceledGateway);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.read(&created.id).await.unwrap().status, CanceledGateway);
        assert_eq!(simulator.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_cancel_keeps_the_settlement_running() {
        let repo = Arc::new(StallingReads::default());
        let (store, simulator) =
            simulator_over(repo.clone(), Arc::new(ScriptedRandom::new([0.1])));
        let created = store.create(transfer()).await.unwrap();
        simulator.schedule(&created);

        // the timer's lookup at 2.0s stalls until 2.5s, the cancel at 2.1s
        // queues behind it and then sees GATEWAY_SUCCESSFUL
        tokio::time::sleep(Duration::from_millis(1900)).await;
        repo.arm();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let err = simulator.cancel(&created.id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition { from: GatewaySuccessful, .. }
        ));
        assert_eq!(simulator.in_flight(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.read(&created.id).await.unwrap().status, Completed);
        assert_eq!(simulator.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_record_stops_the_task() {
        let (store, simulator) = simulator(Arc::new(ScriptedRandom::new([0.1])));
        let created = store.create(transfer()).await.unwrap();
        simulator.schedule(&created);

        store.reset(false).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(simulator.in_flight(), 0);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_all_freezes_everything_in_flight() {
        let (store, simulator) = simulator(Arc::new(ScriptedRandom::new([0.1])));
        let a = store.create(transfer()).await.unwrap();
        let b = store.create(transfer()).await.unwrap();
        simulator.schedule(&a);
        simulator.schedule(&b);

        assert_eq!(simulator.abort_all(), 2);
        tokio::time::sleep(Duration::from_secs(30)).await;
        for id in [&a.id, &b.id] {
            assert_eq!(store.read(id).await.unwrap().status, PendingGateway);
        }
    }
}
