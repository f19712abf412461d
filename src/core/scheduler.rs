//! Request lifecycle: admit, queue, promote, abandon.
//!
//! All bookkeeping lives in one [`AdmissionState`] behind a single
//! `parking_lot::Mutex`. Every call takes the lock once, mutates, and releases
//! it before any transport I/O happens.
//!
//! ```text
//! Pending ──► Admitted ──► Completed
//!    │
//!    ├──► Waiting ──► Admitted ──► Completed
//!    │       └──────► Abandoned
//!    └──► Rejected
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::AdmissionConfig;
use crate::core::audit::{build_audit_event, AuditSink};
use crate::core::ledger::{AdmissionLedger, AdmitDecision};
use crate::core::notifier::{deliver, ProgressNotifier, ADMITTED_POSITION};
use crate::core::registry::ClientRegistry;
use crate::core::transport::{ClientIdFn, Transport};
use crate::core::AdmissionError;
use crate::util::clock::now_ms;
use crate::util::ids::{ClientId, RequestId};

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RequestState {
    /// Just submitted, no decision yet.
    Pending,
    /// Queued at a 1-based position.
    Waiting {
        /// Current queue position.
        position: usize,
    },
    /// Holding a processing slot.
    Admitted,
    /// Processing finished and the slot was released.
    Completed,
    /// The caller left while waiting.
    Abandoned,
    /// Refused at submission.
    Rejected,
}

impl RequestState {
    /// Short lowercase label, used for audit actions.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Waiting { .. } => "waiting",
            Self::Admitted => "admitted",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::Rejected => "rejected",
        }
    }

    /// True once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned | Self::Rejected)
    }
}

/// How a successful submission ended.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The request holds a slot. Release it through the permit when done.
    Admitted(AdmissionPermit),
    /// The caller disconnected while waiting; nothing is held.
    Abandoned(RequestId),
}

impl SubmissionOutcome {
    /// Identifier of the submitted request.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::Admitted(permit) => permit.id,
            Self::Abandoned(id) => *id,
        }
    }

    /// The permit, if admitted.
    #[must_use]
    pub fn into_permit(self) -> Option<AdmissionPermit> {
        match self {
            Self::Admitted(permit) => Some(permit),
            Self::Abandoned(_) => None,
        }
    }
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Slots in use.
    pub processing: usize,
    /// Waiting requests, head first.
    pub waiting: Vec<RequestId>,
    /// Live request count per client.
    pub clients: HashMap<ClientId, usize>,
    /// Configured limits.
    pub limits: AdmissionConfig,
}

/// A held processing slot.
///
/// Dropping the permit releases the slot, so a handler that panics or is
/// cancelled still frees capacity. Releasing twice is harmless.
pub struct AdmissionPermit {
    inner: Arc<Inner>,
    client: ClientId,
    id: RequestId,
    released: bool,
}

impl AdmissionPermit {
    fn new(inner: Arc<Inner>, client: ClientId, id: RequestId) -> Self {
        Self {
            inner,
            client,
            id,
            released: false,
        }
    }

    /// Identifier of the admitted request.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.id
    }

    /// Owning client.
    #[must_use]
    pub const fn client(&self) -> &ClientId {
        &self.client
    }

    /// Release the slot and promote the next waiter.
    pub fn complete(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.complete(&self.client, self.id);
        }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for AdmissionPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionPermit")
            .field("client", &self.client)
            .field("id", &self.id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// State changes discovered while holding the lock, reported after release.
enum Transition {
    Promoted(RequestId, ClientId),
    Reclaimed(RequestId, ClientId),
    /// Slot released by a cancelled waiter after its promotion.
    Completed(RequestId, ClientId),
}

enum Offer {
    Admitted,
    Waiting {
        position: usize,
        rx: watch::Receiver<usize>,
    },
}

enum Tick {
    Waiting,
    Promoted,
    Gone,
}

/// The registry, ledger and notifier, mutated only together.
struct AdmissionState {
    registry: ClientRegistry,
    ledger: AdmissionLedger,
    notifier: ProgressNotifier,
    owners: HashMap<RequestId, ClientId>,
}

impl AdmissionState {
    fn new(config: &AdmissionConfig) -> Self {
        Self {
            registry: ClientRegistry::new(config.max_client_requests),
            ledger: AdmissionLedger::new(config.max_processing, config.max_waiting),
            notifier: ProgressNotifier::new(),
            owners: HashMap::new(),
        }
    }

    /// Waiting capacity first, then the client cap, then admit or queue.
    fn offer(
        &mut self,
        client: &ClientId,
        id: RequestId,
        transport: &Arc<dyn Transport>,
    ) -> Result<Offer, AdmissionError> {
        self.ledger.check_waiting_capacity()?;
        self.registry.register(client, id)?;
        match self.ledger.try_admit_or_enqueue(id) {
            AdmitDecision::Admitted => {
                self.owners.insert(id, client.clone());
                Ok(Offer::Admitted)
            }
            AdmitDecision::Enqueued(position) => {
                self.owners.insert(id, client.clone());
                let rx = self.notifier.subscribe(id, Arc::clone(transport), position);
                Ok(Offer::Waiting { position, rx })
            }
            AdmitDecision::Rejected(e) => {
                self.registry.unregister(client, id);
                Err(e)
            }
        }
    }

    fn complete(&mut self, client: &ClientId, id: RequestId, out: &mut Vec<Transition>) -> bool {
        if !self.ledger.complete(id) {
            return false;
        }
        self.registry.unregister(client, id);
        if let Some(owner) = self.owners.remove(&id).filter(|o| o != client) {
            self.registry.unregister(&owner, id);
        }
        self.notifier.forget(id);
        self.fill_slots(out);
        true
    }

    /// Drop every trace of `id` except its ledger membership.
    fn reclaim(&mut self, id: RequestId) -> Option<ClientId> {
        self.notifier.forget(id);
        let client = self.owners.remove(&id)?;
        self.registry.unregister(&client, id);
        Some(client)
    }

    /// Promote heads of the queue into free slots, skipping abandoned ones,
    /// then republish positions.
    fn fill_slots(&mut self, out: &mut Vec<Transition>) {
        while self.ledger.has_free_slot() {
            let Some(next) = self.ledger.promote_next() else {
                break;
            };
            if self.notifier.is_abandoned(next) {
                if let Some(client) = self.reclaim(next) {
                    out.push(Transition::Reclaimed(next, client));
                }
                continue;
            }
            self.ledger.admit_promoted(next);
            self.notifier.admit(next);
            if let Some(client) = self.owners.get(&next) {
                out.push(Transition::Promoted(next, client.clone()));
            }
        }
        self.notifier.rebroadcast(&self.ledger);
    }

    fn tick(&mut self, id: RequestId, abandoned: bool, out: &mut Vec<Transition>) -> Tick {
        let Some(position) = self.ledger.position_of(id) else {
            return if self.ledger.is_processing(id) {
                Tick::Promoted
            } else {
                Tick::Gone
            };
        };
        if abandoned {
            self.ledger.remove_waiting(id);
            if let Some(client) = self.reclaim(id) {
                out.push(Transition::Reclaimed(id, client));
            }
            self.fill_slots(out);
            return Tick::Gone;
        }
        if position == 1 && self.ledger.has_free_slot() {
            self.fill_slots(out);
            if self.ledger.is_processing(id) {
                return Tick::Promoted;
            }
        }
        Tick::Waiting
    }

    /// The wait loop went away without observing an outcome.
    ///
    /// A request promoted before its waiter noticed already holds a slot; it
    /// leaves as completed, never as abandoned.
    fn abandon(&mut self, id: RequestId, out: &mut Vec<Transition>) {
        if self.ledger.complete(id) {
            if let Some(client) = self.reclaim(id) {
                out.push(Transition::Completed(id, client));
            }
            self.fill_slots(out);
        } else if self.ledger.remove_waiting(id) {
            if let Some(client) = self.reclaim(id) {
                out.push(Transition::Reclaimed(id, client));
            }
            self.fill_slots(out);
        } else {
            self.notifier.forget(id);
        }
    }

    fn state_of(&self, id: RequestId) -> Option<RequestState> {
        if self.ledger.is_processing(id) {
            return Some(RequestState::Admitted);
        }
        self.ledger
            .position_of(id)
            .map(|position| RequestState::Waiting { position })
    }
}

struct Inner {
    config: AdmissionConfig,
    state: Mutex<AdmissionState>,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
}

impl Inner {
    fn record(&self, state: RequestState, id: RequestId, client: &ClientId, payload: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.lock().record(build_audit_event(
                format!("{id}-{}-{}", state.as_str(), now_ms()),
                id.to_string(),
                client.as_str(),
                state.as_str(),
                payload,
            ));
        }
    }

    fn report(&self, transitions: Vec<Transition>) {
        for transition in transitions {
            match transition {
                Transition::Promoted(id, client) => {
                    tracing::info!(request_id = %id, client = %client, "request promoted");
                    self.record(RequestState::Admitted, id, &client, Some("promoted".into()));
                }
                Transition::Reclaimed(id, client) => {
                    tracing::info!(request_id = %id, client = %client, "request abandoned");
                    self.record(RequestState::Abandoned, id, &client, None);
                }
                Transition::Completed(id, client) => {
                    tracing::info!(request_id = %id, client = %client, "request completed");
                    self.record(RequestState::Completed, id, &client, Some("cancelled".into()));
                }
            }
        }
    }

    fn complete(&self, client: &ClientId, id: RequestId) -> bool {
        let mut out = Vec::new();
        let released = self.state.lock().complete(client, id, &mut out);
        if released {
            tracing::info!(request_id = %id, client = %client, "request completed");
            self.record(RequestState::Completed, id, client, None);
        } else {
            tracing::debug!(request_id = %id, "completion ignored: request holds no slot");
        }
        self.report(out);
        released
    }
}

/// Abandons the request if its wait loop is dropped before an outcome.
struct WaitGuard {
    inner: Arc<Inner>,
    id: RequestId,
    armed: bool,
}

impl WaitGuard {
    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut out = Vec::new();
            self.inner.state.lock().abandon(self.id, &mut out);
            self.inner.report(out);
        }
    }
}

/// Admission-control scheduler.
///
/// Cheap to clone; clones share state. `R` is the transport's request context
/// type, from which [`Scheduler::submit_request`] derives the client.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_waiting_room::config::AdmissionConfig;
/// use prometheus_waiting_room::core::{Scheduler, SubmissionOutcome};
/// use prometheus_waiting_room::infra::transport::channel;
///
/// let scheduler = Scheduler::new(AdmissionConfig::default())?;
/// let (transport, mut progress) = channel();
/// // Forward `progress` to the client as a streaming response...
/// match scheduler.submit_request(&peer_addr, transport).await? {
///     SubmissionOutcome::Admitted(permit) => {
///         run_inference().await;
///         permit.complete();
///     }
///     SubmissionOutcome::Abandoned(_) => {}
/// }
/// ```
pub struct Scheduler<R: ?Sized = SocketAddr> {
    inner: Arc<Inner>,
    extract: ClientIdFn<R>,
}

impl<R: ?Sized> Clone for Scheduler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            extract: Arc::clone(&self.extract),
        }
    }
}

impl<R: ?Sized> fmt::Debug for Scheduler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Scheduler<SocketAddr> {
    /// Scheduler keyed by caller IP address.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::InvalidConfig`] when `config` fails validation.
    pub fn new(config: AdmissionConfig) -> Result<Self, AdmissionError> {
        crate::builders::SchedulerBuilder::new(config).build()
    }
}

impl<R: ?Sized> Scheduler<R> {
    pub(crate) fn from_parts(
        config: AdmissionConfig,
        extract: ClientIdFn<R>,
        audit: Option<Box<dyn AuditSink>>,
    ) -> Self {
        let state = Mutex::new(AdmissionState::new(&config));
        Self {
            inner: Arc::new(Inner {
                config,
                state,
                audit: audit.map(Mutex::new),
            }),
            extract,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AdmissionConfig {
        &self.inner.config
    }

    /// Client identity for a transport request context.
    #[must_use]
    pub fn client_id(&self, ctx: &R) -> ClientId {
        (self.extract)(ctx)
    }

    /// [`Scheduler::submit`] with the client derived from `ctx`.
    pub fn submit_request<T: Transport>(
        &self,
        ctx: &R,
        transport: T,
    ) -> impl Future<Output = Result<SubmissionOutcome, AdmissionError>> + Send + '_ {
        let client = self.client_id(ctx);
        self.submit(client, transport)
    }

    /// Submit a request and resolve once it is admitted or abandoned.
    ///
    /// Immediate admission signals `proceed` without any position push.
    /// Queued requests receive their position, then every change, then `0`
    /// right before `proceed`. Dropping the returned future while queued
    /// abandons the request.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::WaitingLimitExceeded`] or
    /// [`AdmissionError::ClientLimitExceeded`]; the transport has already been
    /// told via `reject`.
    pub async fn submit<T: Transport>(
        &self,
        client: ClientId,
        transport: T,
    ) -> Result<SubmissionOutcome, AdmissionError> {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let id = RequestId::new();
        self.inner.record(RequestState::Pending, id, &client, None);

        let offer = self.inner.state.lock().offer(&client, id, &transport);
        match offer {
            Err(reason) => {
                tracing::warn!(request_id = %id, client = %client, %reason, "request rejected");
                self.inner
                    .record(RequestState::Rejected, id, &client, Some(reason.to_string()));
                if let Err(e) = transport.reject(&reason).await {
                    tracing::debug!(request_id = %id, error = %e, "reject signal dropped");
                }
                Err(reason)
            }
            Ok(Offer::Admitted) => {
                tracing::info!(request_id = %id, client = %client, "request admitted");
                self.inner.record(RequestState::Admitted, id, &client, None);
                let permit = AdmissionPermit::new(Arc::clone(&self.inner), client, id);
                signal_proceed(transport.as_ref(), id).await;
                Ok(SubmissionOutcome::Admitted(permit))
            }
            Ok(Offer::Waiting { position, rx }) => {
                tracing::info!(request_id = %id, client = %client, position, "request queued");
                self.inner.record(
                    RequestState::Waiting { position },
                    id,
                    &client,
                    Some(position.to_string()),
                );
                Ok(self.wait(id, client, transport, rx).await)
            }
        }
    }

    /// Release `id`'s slot and promote the next live waiter.
    ///
    /// Returns false, changing nothing, if `id` holds no slot (unknown,
    /// still waiting, or already completed).
    pub fn complete(&self, client: &ClientId, id: RequestId) -> bool {
        self.inner.complete(client, id)
    }

    /// Current state of a live request, or `None` once it has left.
    #[must_use]
    pub fn state_of(&self, id: RequestId) -> Option<RequestState> {
        self.inner.state.lock().state_of(id)
    }

    /// Point-in-time view of slots, queue and clients.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let state = self.inner.state.lock();
        SchedulerSnapshot {
            processing: state.ledger.processing_len(),
            waiting: state.ledger.waiting_ids(),
            clients: state
                .registry
                .counts()
                .map(|(client, n)| (client.clone(), n))
                .collect(),
            limits: self.inner.config.clone(),
        }
    }

    async fn wait(
        &self,
        id: RequestId,
        client: ClientId,
        transport: Arc<dyn Transport>,
        mut rx: watch::Receiver<usize>,
    ) -> SubmissionOutcome {
        let mut guard = WaitGuard {
            inner: Arc::clone(&self.inner),
            id,
            armed: true,
        };
        let period = self.inner.config.poll_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_pushed = None;

        loop {
            let position = *rx.borrow_and_update();
            if last_pushed != Some(position) {
                deliver(transport.as_ref(), id, position).await;
                last_pushed = Some(position);
            }
            if position == ADMITTED_POSITION {
                guard.disarm();
                let permit = AdmissionPermit::new(Arc::clone(&self.inner), client, id);
                signal_proceed(transport.as_ref(), id).await;
                return SubmissionOutcome::Admitted(permit);
            }

            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        // A completion found us abandoned and reclaimed the entry.
                        guard.disarm();
                        return SubmissionOutcome::Abandoned(id);
                    }
                }
                _ = ticker.tick() => {
                    let abandoned = transport.is_abandoned();
                    let mut out = Vec::new();
                    let tick = self.inner.state.lock().tick(id, abandoned, &mut out);
                    self.inner.report(out);
                    match tick {
                        Tick::Gone => {
                            guard.disarm();
                            return SubmissionOutcome::Abandoned(id);
                        }
                        Tick::Promoted | Tick::Waiting => {
                            tracing::trace!(request_id = %id, "poll tick");
                        }
                    }
                }
            }
        }
    }
}

async fn signal_proceed(transport: &dyn Transport, id: RequestId) {
    if let Err(e) = transport.proceed().await {
        tracing::debug!(request_id = %id, error = %e, "proceed signal dropped");
    }
}
