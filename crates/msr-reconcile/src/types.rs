use msr_model::{ConfigNode, Operation, ResourceAddress};
use serde::Serialize;

/// Lifecycle of the hosting process as seen by handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessState {
    /// Replaying persisted configuration; every step is model-only.
    Booting,
    Running,
    /// Tree changes are committed but some runtime state only catches up on reload.
    ReloadRequired,
}

/// Result of one step against the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Applied,
    /// Target already in the requested state (idempotent add, absent forwarded remove).
    NoOp,
}

/// Why a step left the runtime untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    NoOp,
    HandlerPolicy,
    Booting,
    ExternalReference,
    ServerNotLive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeStep {
    Applied,
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepReport {
    pub operation: Operation,
    pub status: StepStatus,
    pub runtime: RuntimeStep,
    /// Injected by the legacy shim rather than requested by the caller.
    pub forwarded: bool,
}

/// Everything a committed transaction did.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Outcome {
    pub steps: Vec<StepReport>,
    pub warnings: Vec<String>,
    pub reload_required: bool,
}

impl Outcome {
    /// `true` when no step changed the tree.
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::NoOp)
    }

    /// Report of the last caller-requested step.
    pub fn primary(&self) -> Option<&StepReport> {
        self.steps.iter().rev().find(|s| !s.forwarded)
    }

    pub fn forwarded(&self) -> Vec<&ResourceAddress> {
        self.steps
            .iter()
            .filter(|s| s.forwarded)
            .map(|s| &s.operation.address)
            .collect()
    }

    pub fn runtime_applied(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.runtime == RuntimeStep::Applied)
            .count()
    }
}

/// Node state around one step: `before` is absent for an add, `after` for a
/// remove.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeSnapshot {
    pub before: Option<ConfigNode>,
    pub after: Option<ConfigNode>,
    /// Which runtime path the step took, for handlers whose recovery depends on it.
    pub note: Option<&'static str>,
}

impl NodeSnapshot {
    /// Whichever side exists, preferring the post-step node.
    pub fn node(&self) -> Option<&ConfigNode> {
        self.after.as_ref().or(self.before.as_ref())
    }
}
