//! Transaction context handed to every step.
//!
//! Steps mutate a working copy of the tree. The controller swaps it in on
//! success and drops it on failure, after replaying the journal of runtime
//! actions backwards.

use std::sync::Arc;

use msr_config::StartupContext;
use msr_model::{ConfigTree, Operation, ServiceName};
use msr_runtime::{live_broker, BrokerFactory, BrokerRuntime, ServiceRegistry};
use tracing::warn;

use crate::handler::StepHandler;
use crate::types::{NodeSnapshot, Outcome, ProcessState, RuntimeStep, StepReport, StepStatus};

/// A runtime action that has been performed and must be undone if the
/// transaction fails.
#[derive(Clone, Debug)]
pub(crate) struct JournalEntry {
    pub handler: StepHandler,
    pub operation: Operation,
    pub snapshot: NodeSnapshot,
}

pub struct OperationContext<'a> {
    committed: &'a ConfigTree,
    tree: ConfigTree,
    registry: &'a dyn ServiceRegistry,
    broker_factory: Option<&'a dyn BrokerFactory>,
    startup: &'a StartupContext,
    process: ProcessState,
    note: Option<&'static str>,
    journal: Vec<JournalEntry>,
    outcome: Outcome,
}

impl<'a> OperationContext<'a> {
    pub(crate) fn new(
        committed: &'a ConfigTree,
        registry: &'a dyn ServiceRegistry,
        broker_factory: Option<&'a dyn BrokerFactory>,
        startup: &'a StartupContext,
        process: ProcessState,
    ) -> Self {
        Self {
            committed,
            tree: committed.clone(),
            registry,
            broker_factory,
            startup,
            process,
            note: None,
            journal: Vec::new(),
            outcome: Outcome::default(),
        }
    }

    /// Tree as it was when the transaction began.
    pub fn committed(&self) -> &ConfigTree {
        self.committed
    }

    /// Working copy, including the current step's mutation.
    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut ConfigTree {
        &mut self.tree
    }

    pub fn registry(&self) -> &dyn ServiceRegistry {
        self.registry
    }

    pub fn broker_factory(&self) -> Option<&dyn BrokerFactory> {
        self.broker_factory
    }

    pub fn startup(&self) -> &StartupContext {
        self.startup
    }

    pub fn process_state(&self) -> ProcessState {
        self.process
    }

    /// Server service is installed and up.
    pub fn server_live(&self, server: &str) -> bool {
        self.registry
            .lookup(&ServiceName::server(server))
            .map(|e| e.is_up())
            .unwrap_or(false)
    }

    pub fn live_broker(&self, server: &str) -> Option<Arc<dyn BrokerRuntime>> {
        live_broker(self.registry, server)
    }

    /// Records a non-fatal runtime problem on the outcome.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(warning = %message, "runtime step downgraded to warning");
        self.outcome.warnings.push(message);
    }

    pub fn mark_reload_required(&mut self) {
        self.outcome.reload_required = true;
    }

    /// Tags the current step's runtime path; handed back to the handler's
    /// recovery through [`NodeSnapshot::note`].
    pub fn note(&mut self, note: &'static str) {
        self.note = Some(note);
    }

    pub(crate) fn take_note(&mut self) -> Option<&'static str> {
        self.note.take()
    }

    pub(crate) fn push_journal(&mut self, entry: JournalEntry) {
        self.journal.push(entry);
    }

    pub(crate) fn take_journal(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.journal)
    }

    pub(crate) fn record_step(
        &mut self,
        operation: &Operation,
        status: StepStatus,
        runtime: RuntimeStep,
        forwarded: bool,
    ) {
        self.outcome.steps.push(StepReport {
            operation: operation.clone(),
            status,
            runtime,
            forwarded,
        });
    }

    pub(crate) fn into_parts(self) -> (ConfigTree, Outcome) {
        (self.tree, self.outcome)
    }
}
