// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::fmt;

/// Producer-assigned 64-bit work item identifier, unique within a session.
pub type ItemId = u64;

/// Opaque transport-assigned address of a connected worker.
///
/// The broker never interprets the contents; it is only a key in the worker
/// table and a routing target for outbound frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerIdentity(String);

impl WorkerIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        WorkerIdentity(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerIdentity {
    fn from(identity: &str) -> Self {
        WorkerIdentity(identity.to_owned())
    }
}

impl From<String> for WorkerIdentity {
    fn from(identity: String) -> Self {
        WorkerIdentity(identity)
    }
}
