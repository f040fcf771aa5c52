//! Addressed users

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BrokerResult;
use crate::form::FormDescription;
use crate::host::HostReply;
use crate::service::FormService;

/// Identifier of one connected user, as the host knows it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TargetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A user a form can be shown to
///
/// Obtained from [`FormService::target`]. Cloning is cheap; every clone
/// addresses the same user through the same broker.
#[derive(Clone)]
pub struct FormTarget {
    id: TargetId,
    broker: FormService,
}

impl FormTarget {
    pub(crate) fn new(id: TargetId, broker: FormService) -> Self {
        Self { id, broker }
    }

    pub fn id(&self) -> &TargetId {
        &self.id
    }

    /// Submit a frozen description and wait for the host's raw reply
    pub(crate) async fn submit(&self, form: FormDescription) -> BrokerResult<HostReply> {
        self.broker.submit(&self.id, form).await
    }
}

impl fmt::Debug for FormTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormTarget").field("id", &self.id).finish()
    }
}
