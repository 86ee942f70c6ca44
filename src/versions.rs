//! Minimal version-number comparison for core release thresholds.

use std::cmp::Ordering;

/// A dotted version number compared component-wise.
///
/// Components are split on `.` and `-`; numeric components compare
/// numerically, non-numeric qualifiers (`SNAPSHOT`, `rc`, hashes) compare
/// below any release component, so `2.382-SNAPSHOT` orders before `2.382`.
/// This is only as precise as the core threshold checks need.
#[derive(Debug, Clone)]
pub struct VersionNumber {
    components: Vec<i64>,
}

/// Pad value for missing components; qualifier components sort below it.
const RELEASE: i64 = 0;
const QUALIFIER: i64 = -1;

impl VersionNumber {
    pub fn parse(version: &str) -> Self {
        let components = version
            .split(['.', '-'])
            .map(|part| part.parse::<i64>().unwrap_or(QUALIFIER))
            .collect();
        Self { components }
    }

    pub fn is_older_than(&self, other: &VersionNumber) -> bool {
        self.cmp(other) == Ordering::Less
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(RELEASE);
            let b = other.components.get(i).copied().unwrap_or(RELEASE);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// equality must agree with the padded component-wise comparison
impl PartialEq for VersionNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionNumber {}
