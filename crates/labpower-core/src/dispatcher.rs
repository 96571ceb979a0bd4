//! Action dispatcher: resolve, fan out, audit
//!
//! One `dispatch` call handles one request end to end. Executor calls for a
//! fleet-wide action run concurrently and are all awaited before the single
//! audit entry for the request is written.

use std::sync::Arc;
use std::time::Duration;

use labpower_exec::{ExecError, PowerAction, PowerExecutor, Target};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::action::{ActionKind, ActionRequest};
use crate::audit::{AuditEntry, AuditLog, BATCH_TARGET};
use crate::error::{AuditError, DispatchError};
use crate::fleet::Fleet;
use crate::state::DispatchState;

/// Default bound on a single executor call
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(5);

/// A target whose command could not be issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    /// The target
    pub target: Target,
    /// Why the executor failed
    pub error: ExecError,
}

/// Result of one dispatch, handed back to the presentation layer
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// False when the request was rejected before any command was issued
    pub accepted: bool,
    /// Operator-facing status line
    pub message: String,
    /// Requested kind, if it parsed
    pub kind: Option<ActionKind>,
    /// Why the request was rejected
    pub rejection: Option<DispatchError>,
    /// Number of targets a command was attempted against
    pub attempted: usize,
    /// Per-target executor failures, in fleet order
    pub failures: Vec<TargetFailure>,
    /// Set when the audit entry could not be written
    pub audit_error: Option<AuditError>,
}

impl DispatchOutcome {
    fn rejected(kind: Option<ActionKind>, reason: DispatchError) -> Self {
        let message = match &reason {
            DispatchError::UnknownAction(_) => "Unknown action.".to_string(),
            DispatchError::UnknownTarget(address) => format!("Unknown target: {address}."),
            DispatchError::MissingTarget(kind) => format!("No target selected for {kind}."),
        };

        Self {
            accepted: false,
            message,
            kind,
            rejection: Some(reason),
            attempted: 0,
            failures: Vec::new(),
            audit_error: None,
        }
    }

    fn completed(
        kind: ActionKind,
        targets: &[Target],
        failures: Vec<TargetFailure>,
        audit_error: Option<AuditError>,
    ) -> Self {
        let mut message = compose_message(kind, targets, &failures);
        if audit_error.is_some() {
            message.push_str(" Warning: the action could not be recorded in the audit log.");
        }

        Self {
            accepted: true,
            message,
            kind: Some(kind),
            rejection: None,
            attempted: targets.len(),
            failures,
            audit_error,
        }
    }

    /// Accepted, every command dispatched, and audited
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.accepted && self.failures.is_empty() && self.audit_error.is_none()
    }
}

fn capitalized(action: PowerAction) -> &'static str {
    match action {
        PowerAction::Shutdown => "Shutdown",
        PowerAction::Restart => "Restart",
    }
}

fn compose_message(kind: ActionKind, targets: &[Target], failures: &[TargetFailure]) -> String {
    let action = kind.power_action();

    if kind.is_fleet_wide() {
        if failures.is_empty() {
            return format!("{} command sent to ALL machines.", capitalized(action));
        }
        let failed: Vec<String> = failures.iter().map(|f| f.target.describe()).collect();
        return format!(
            "{} command sent to {} of {} machines. Failed: {}.",
            capitalized(action),
            targets.len() - failures.len(),
            targets.len(),
            failed.join(", ")
        );
    }

    match (targets.first(), failures.first()) {
        (_, Some(failure)) => format!(
            "Failed to send {action} command to {}: {}",
            failure.target.name, failure.error
        ),
        (Some(target), None) => format!("{} command sent to {}.", capitalized(action), target.name),
        (None, None) => format!("{} command sent.", capitalized(action)),
    }
}

/// Tracks the per-call state machine and logs each step
#[derive(Debug)]
struct Progress {
    state: DispatchState,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: DispatchState::Received,
        }
    }

    fn advance(&mut self, next: DispatchState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal dispatch transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "dispatch state");
        self.state = next;
    }
}

/// Resolves requests against the fleet and drives executor and audit log
pub struct Dispatcher {
    fleet: Arc<Fleet>,
    executor: Arc<dyn PowerExecutor>,
    audit: Arc<dyn AuditLog>,
    exec_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fleet", &self.fleet)
            .field("executor", &self.executor.executor_type())
            .field("exec_timeout", &self.exec_timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher with the default executor timeout
    pub fn new(
        fleet: Arc<Fleet>,
        executor: Arc<dyn PowerExecutor>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            fleet,
            executor,
            audit,
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
        }
    }

    /// Bound every executor call by `limit`
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.exec_timeout = limit;
        self
    }

    /// The fleet this dispatcher serves
    #[must_use]
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Parse a raw action name and dispatch it.
    ///
    /// An unrecognized name is rejected without touching executor or audit log.
    pub async fn perform(&self, action: &str, target: Option<&str>, actor: &str) -> DispatchOutcome {
        match ActionRequest::parse(action, target) {
            Ok(request) => self.dispatch(request, actor).await,
            Err(reason) => {
                warn!(actor = %actor, action = %action, "rejected unknown action");
                DispatchOutcome::rejected(None, reason)
            }
        }
    }

    /// Handle one request end to end.
    ///
    /// Once targets are resolved the rest runs in its own task, so dropping
    /// the returned future cannot leave issued commands without an audit entry.
    #[instrument(skip(self, request), fields(action = %request.kind))]
    pub async fn dispatch(&self, request: ActionRequest, actor: &str) -> DispatchOutcome {
        let mut progress = Progress::new();
        let kind = request.kind;

        progress.advance(DispatchState::Resolving);
        let targets = match self.resolve(&request) {
            Ok(targets) => targets,
            Err(reason) => {
                progress.advance(DispatchState::Rejected);
                warn!(actor = %actor, reason = %reason, "request rejected");
                return DispatchOutcome::rejected(Some(kind), reason);
            }
        };

        let batch = Batch {
            executor: Arc::clone(&self.executor),
            audit: Arc::clone(&self.audit),
            exec_timeout: self.exec_timeout,
            kind,
            targets: targets.clone(),
            actor: actor.to_string(),
        };

        match tokio::spawn(batch.run(progress).in_current_span()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(actor = %actor, error = %e, "dispatch task failed");
                let failures = targets
                    .iter()
                    .map(|target| TargetFailure {
                        target: target.clone(),
                        error: ExecError::IoError(format!("dispatch task failed: {e}")),
                    })
                    .collect();
                DispatchOutcome::completed(
                    kind,
                    &targets,
                    failures,
                    Some(AuditError::WriterUnavailable(e.to_string())),
                )
            }
        }
    }

    /// Map a request to the targets it affects
    fn resolve(&self, request: &ActionRequest) -> Result<Vec<Target>, DispatchError> {
        if request.kind.is_fleet_wide() {
            return Ok(self.fleet.targets().to_vec());
        }

        let address = request
            .target
            .as_deref()
            .ok_or(DispatchError::MissingTarget(request.kind))?;

        self.fleet
            .find(address)
            .cloned()
            .map(|target| vec![target])
            .ok_or_else(|| DispatchError::UnknownTarget(address.to_string()))
    }
}

/// A resolved request: execute, then record
struct Batch {
    executor: Arc<dyn PowerExecutor>,
    audit: Arc<dyn AuditLog>,
    exec_timeout: Duration,
    kind: ActionKind,
    targets: Vec<Target>,
    actor: String,
}

impl Batch {
    async fn run(self, mut progress: Progress) -> DispatchOutcome {
        let kind = self.kind;

        progress.advance(DispatchState::Executing);
        let failures = self.execute_all(kind.power_action()).await;

        let target_description = if kind.is_fleet_wide() {
            BATCH_TARGET.to_string()
        } else {
            self.targets
                .first()
                .map(Target::describe)
                .unwrap_or_default()
        };
        let entry = AuditEntry::new(&self.actor, kind.as_str(), target_description);

        progress.advance(DispatchState::Logged);
        let audit_error = match self.audit.append(&entry).await {
            Ok(()) => None,
            Err(e) => {
                error!(
                    actor = %self.actor,
                    target = %entry.target_description,
                    error = %e,
                    "audit write failed; command was still issued"
                );
                Some(e)
            }
        };

        progress.advance(DispatchState::Completed);
        info!(
            actor = %self.actor,
            targets = self.targets.len(),
            failed = failures.len(),
            "dispatch completed"
        );

        DispatchOutcome::completed(kind, &self.targets, failures, audit_error)
    }

    /// One bounded executor call per target, all in flight at once
    async fn execute_all(&self, action: PowerAction) -> Vec<TargetFailure> {
        let mut handles = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            let executor = Arc::clone(&self.executor);
            let owned = target.clone();
            let limit = self.exec_timeout;

            let handle = tokio::spawn(
                async move {
                    match timeout(limit, executor.execute(&owned, action)).await {
                        Ok(result) => result,
                        Err(_) => Err(ExecError::Timeout { timeout: limit }),
                    }
                }
                .in_current_span(),
            );

            handles.push((target.clone(), handle));
        }

        let mut failures = Vec::new();

        for (target, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ExecError::IoError(format!("executor task failed: {e}"))),
            };

            match result {
                Ok(()) => {
                    info!(host = %target.address, name = %target.name, action = %action, "command issued");
                }
                Err(error) => {
                    error!(
                        host = %target.address,
                        name = %target.name,
                        action = %action,
                        error = %error,
                        "command failed"
                    );
                    failures.push(TargetFailure { target, error });
                }
            }
        }

        failures
    }
}
