//! Action kinds and control requests

use std::fmt;
use std::str::FromStr;

use labpower_exec::PowerAction;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// The four operations an operator can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ShutdownOne,
    RestartOne,
    ShutdownAll,
    RestartAll,
}

impl ActionKind {
    /// Every valid kind
    pub const ALL: [ActionKind; 4] = [
        ActionKind::ShutdownOne,
        ActionKind::RestartOne,
        ActionKind::ShutdownAll,
        ActionKind::RestartAll,
    ];

    /// Wire and audit name, e.g. `restart_all`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ShutdownOne => "shutdown_one",
            ActionKind::RestartOne => "restart_one",
            ActionKind::ShutdownAll => "shutdown_all",
            ActionKind::RestartAll => "restart_all",
        }
    }

    /// Power primitive issued to each resolved target
    #[must_use]
    pub fn power_action(self) -> PowerAction {
        match self {
            ActionKind::ShutdownOne | ActionKind::ShutdownAll => PowerAction::Shutdown,
            ActionKind::RestartOne | ActionKind::RestartAll => PowerAction::Restart,
        }
    }

    /// Whether the kind addresses the whole fleet
    #[must_use]
    pub fn is_fleet_wide(self) -> bool {
        matches!(self, ActionKind::ShutdownAll | ActionKind::RestartAll)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

/// A validated control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Requested operation
    pub kind: ActionKind,
    /// Address of the target for single-target kinds; ignored otherwise
    pub target: Option<String>,
}

impl ActionRequest {
    /// Request against a single machine
    pub fn one(kind: ActionKind, address: impl Into<String>) -> Self {
        Self {
            kind,
            target: Some(address.into()),
        }
    }

    /// Request against every machine in the fleet
    #[must_use]
    pub fn all(kind: ActionKind) -> Self {
        Self { kind, target: None }
    }

    /// Parse a request as submitted by the presentation layer
    ///
    /// # Errors
    /// Returns `DispatchError::UnknownAction` if `action` names no known kind
    pub fn parse(action: &str, target: Option<&str>) -> Result<Self, DispatchError> {
        let kind = action.parse::<ActionKind>()?;
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Ok(Self { kind, target })
    }
}
