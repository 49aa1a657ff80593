//! Symbolic service names: the join key between configuration nodes and
//! live runtime services.

use std::fmt;

use serde::Serialize;

const BASE: &str = "messaging";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ServiceName(Vec<String>);

impl ServiceName {
    pub fn of(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| s.to_string()).collect())
    }

    pub fn append(&self, segment: impl Into<String>) -> Self {
        let mut v = self.0.clone();
        v.push(segment.into());
        Self(v)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Last segment, e.g. the queue name of a queue service.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// `true` if `self` is `other` or nested below it.
    pub fn is_under(&self, other: &ServiceName) -> bool {
        self.0.starts_with(&other.0)
    }

    pub fn base() -> Self {
        Self::of(&[BASE])
    }

    /// Broker service for one server.
    pub fn server(server: &str) -> Self {
        Self::base().append("server").append(server)
    }

    /// Message-queue management sub-service of a server.
    pub fn queue_manager(server: &str) -> Self {
        Self::server(server).append("jms-manager")
    }

    pub fn queue(server: &str, queue: &str) -> Self {
        Self::server(server).append("queue").append(queue)
    }

    pub fn broadcast_binding(server: &str, group: &str) -> Self {
        Self::server(server)
            .append("binding")
            .append("broadcast")
            .append(group)
    }

    pub fn discovery_binding(server: &str, group: &str) -> Self {
        Self::server(server)
            .append("binding")
            .append("discovery")
            .append(group)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}
