//! The configured set of targets

use std::collections::HashSet;

use labpower_exec::{HostAddr, Target};
use tracing::warn;

use crate::error::CoreError;

/// Immutable fleet, built once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct Fleet {
    targets: Vec<Target>,
}

impl Fleet {
    /// Build a fleet, keeping declaration order.
    ///
    /// Addresses identify targets, so a repeated address keeps its first
    /// declaration and later ones are dropped with a warning.
    ///
    /// # Errors
    /// Returns `CoreError::EmptyFleet` if no targets remain
    pub fn new(targets: impl IntoIterator<Item = Target>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        for target in targets {
            if seen.insert(target.address.clone()) {
                unique.push(target);
            } else {
                warn!(
                    name = %target.name,
                    address = %target.address,
                    "duplicate fleet address ignored"
                );
            }
        }

        if unique.is_empty() {
            return Err(CoreError::EmptyFleet);
        }

        Ok(Self { targets: unique })
    }

    /// All targets in declaration order
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Number of targets
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Always false for a constructed fleet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Look up a target by address.
    ///
    /// Input that is not a valid host address can never match.
    #[must_use]
    pub fn find(&self, address: &str) -> Option<&Target> {
        let addr = HostAddr::parse(address).ok()?;
        self.targets.iter().find(|t| t.address == addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, addr: &str) -> Target {
        Target::new(name, HostAddr::parse(addr).unwrap())
    }

    #[test]
    fn test_keeps_declaration_order() {
        let fleet = Fleet::new(vec![
            target("B", "10.0.0.2"),
            target("A", "10.0.0.1"),
        ])
        .unwrap();

        let names: Vec<_> = fleet.targets().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_duplicate_addresses_keep_first() {
        let fleet = Fleet::new(vec![
            target("A", "10.0.0.1"),
            target("B", "10.0.0.2"),
            target("A-again", "10.0.0.1"),
        ])
        .unwrap();

        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet.find("10.0.0.1").unwrap().name, "A");
    }

    #[test]
    fn test_empty_fleet_rejected() {
        assert!(matches!(Fleet::new(Vec::new()), Err(CoreError::EmptyFleet)));
    }

    #[test]
    fn test_find() {
        let fleet = Fleet::new(vec![target("Lab-PC-01", "lab-pc-01.school.local")]).unwrap();

        assert!(fleet.find("LAB-PC-01.school.local").is_some());
        assert!(fleet.find("10.9.9.9").is_none());
        assert!(fleet.find("lab-pc-01.school.local; reboot").is_none());
    }

    #[test]
    fn test_ipv6_spellings_are_one_target() {
        let fleet = Fleet::new(vec![target("A", "fe80::1"), target("A-upper", "FE80::1")]).unwrap();

        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet.find("FE80:0:0:0:0:0:0:1").unwrap().name, "A");
    }
}
