// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test verdicts and verdict aggregation.

use crate::errors::VerdictParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The verdict of a single combinatorial test, or of a group of tests.
///
/// On the wire and in the persisted cache, verdicts are encoded as the integers `1..=4`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TestVerdict {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test could not decide, for example because a precondition did not hold.
    Inconclusive,

    /// The test was filtered out by an earlier, equivalent failure.
    Filtered,
}

impl TestVerdict {
    /// All verdicts, in wire order.
    pub const ALL: [TestVerdict; 4] = [
        TestVerdict::Passed,
        TestVerdict::Failed,
        TestVerdict::Inconclusive,
        TestVerdict::Filtered,
    ];

    /// Returns the display name of this verdict.
    pub fn name(self) -> &'static str {
        match self {
            TestVerdict::Passed => "Passed",
            TestVerdict::Failed => "Failed",
            TestVerdict::Inconclusive => "Inconclusive",
            TestVerdict::Filtered => "Filtered",
        }
    }

    /// Returns the icon file used by tree hosts for this verdict.
    pub fn icon_name(self) -> &'static str {
        match self {
            TestVerdict::Passed => "passed.svg",
            TestVerdict::Failed => "failed.svg",
            TestVerdict::Inconclusive => "inconclusive.svg",
            TestVerdict::Filtered => "filtered.svg",
        }
    }
}

impl From<TestVerdict> for u8 {
    fn from(verdict: TestVerdict) -> Self {
        match verdict {
            TestVerdict::Passed => 1,
            TestVerdict::Failed => 2,
            TestVerdict::Inconclusive => 3,
            TestVerdict::Filtered => 4,
        }
    }
}

impl TryFrom<u8> for TestVerdict {
    type Error = VerdictParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TestVerdict::Passed),
            2 => Ok(TestVerdict::Failed),
            3 => Ok(TestVerdict::Inconclusive),
            4 => Ok(TestVerdict::Filtered),
            other => Err(VerdictParseError::new(other.to_string())),
        }
    }
}

impl FromStr for TestVerdict {
    type Err = VerdictParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestVerdict::ALL
            .into_iter()
            .find(|verdict| verdict.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VerdictParseError::new(s))
    }
}

impl fmt::Display for TestVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregates a sequence of verdicts into a single verdict.
///
/// * If any verdict is unset, the aggregate is unset (still pending).
/// * Otherwise, if any verdict is [`TestVerdict::Failed`], the aggregate is `Failed`.
/// * Otherwise the aggregate is [`TestVerdict::Passed`]. Inconclusive and filtered verdicts count
///   as non-failing, and an empty sequence aggregates to `Passed`.
pub fn aggregate_verdict<I>(verdicts: I) -> Option<TestVerdict>
where
    I: IntoIterator<Item = Option<TestVerdict>>,
{
    let mut any_failed = false;
    for verdict in verdicts {
        match verdict {
            None => return None,
            Some(TestVerdict::Failed) => any_failed = true,
            Some(_) => {}
        }
    }

    if any_failed {
        Some(TestVerdict::Failed)
    } else {
        Some(TestVerdict::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use test_strategy::proptest;

    use TestVerdict::*;

    #[test_case(&[Some(Passed), Some(Passed), Some(Failed)], Some(Failed); "any failed")]
    #[test_case(&[Some(Passed), None, Some(Passed)], None; "any pending")]
    #[test_case(&[Some(Passed), Some(Passed)], Some(Passed); "all passed")]
    #[test_case(&[Some(Failed), None], None; "pending wins over failed")]
    #[test_case(&[Some(Inconclusive), Some(Filtered)], Some(Passed); "non-failing kinds")]
    #[test_case(&[], Some(Passed); "empty")]
    fn aggregate(input: &[Option<TestVerdict>], expected: Option<TestVerdict>) {
        assert_eq!(aggregate_verdict(input.iter().copied()), expected);
    }

    #[proptest]
    fn aggregate_matches_rule(verdicts: Vec<Option<TestVerdict>>) {
        let actual = aggregate_verdict(verdicts.iter().copied());
        let expected = if verdicts.iter().any(Option::is_none) {
            None
        } else if verdicts.contains(&Some(Failed)) {
            Some(Failed)
        } else {
            Some(Passed)
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn wire_encoding() {
        for verdict in TestVerdict::ALL {
            let json = serde_json::to_string(&verdict).unwrap();
            assert_eq!(json, u8::from(verdict).to_string());
            assert_eq!(serde_json::from_str::<TestVerdict>(&json).unwrap(), verdict);
        }
        serde_json::from_str::<TestVerdict>("5").expect_err("5 is not a verdict");
    }

    #[test]
    fn parse_names() {
        assert_eq!("failed".parse::<TestVerdict>().unwrap(), Failed);
        assert_eq!("Inconclusive".parse::<TestVerdict>().unwrap(), Inconclusive);
        "maybe".parse::<TestVerdict>().expect_err("unknown verdict name");
    }
}
