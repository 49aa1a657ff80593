//! msr-testkit
//!
//! Doubles and a harness for scenario tests.
//!
//! - [`RecordingRegistry`] logs every install/remove call in issue order.
//! - [`FaultyBroker`] wraps the in-memory broker with injectable failures and
//!   a call log; [`FaultyBrokerFactory`] hands them out and keeps them for
//!   inspection.
//! - [`Harness`] wires a controller to both.

mod faults;
mod harness;
mod recording;

pub use faults::{BrokerCall, Faults, FaultyBroker, FaultyBrokerFactory};
pub use harness::{Harness, STANDARD_CONFIG};
pub use recording::{RecordingRegistry, RegistryCall};
