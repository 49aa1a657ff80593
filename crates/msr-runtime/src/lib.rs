//! msr-runtime
//!
//! Interfaces of the live side of a messaging deployment, as consumed by the
//! reconciler:
//! - the runtime service registry (lookup / install / remove),
//! - the broker runtime (imperative fallback actions, resource lookup),
//! - the component control proxy resolving live sub-resource handles.
//!
//! In-memory implementations back the developer CLI and the tests.

mod broker;
mod control;
mod error;
mod registry;

pub use broker::{
    BrokerFactory, BrokerRuntime, ComponentControl, InMemoryBroker, InMemoryBrokerFactory,
    InMemoryComponent,
};
pub use control::{ComponentControlProxy, ControlOp, ControlRole};
pub use error::{ControlError, RegistryError, RuntimeActionError};
pub use registry::{
    live_broker, InMemoryServiceRegistry, Removal, RemovalPolicy, ServiceDescriptor, ServiceEntry,
    ServiceKind, ServiceRegistry, ServiceState,
};
