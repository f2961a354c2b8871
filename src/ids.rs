use std::fmt;
use std::sync::Arc;

/// Identifier of a unit of work.
///
/// Two [`Task`](crate::Task) values sharing a `TaskId` are *equivalent*: they
/// denote the same logical piece of work, possibly enriched with
/// worker-specific hints. A success on any one of them satisfies all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Arc<str>);

impl TaskId {
    /// Builds a new task identifier from anything string-like.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<T: Into<Arc<str>>> From<T> for TaskId {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Identifier of a worker, unique within a single [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(Arc<str>);

impl WorkerId {
    /// Builds a new worker identifier from anything string-like.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<T: Into<Arc<str>>> From<T> for WorkerId {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
