// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The combinatorial testing data model.
//!
//! The types here mirror what the test service reports and what is persisted to disk. Keys are
//! camelCase on the wire.

use crate::{
    errors::GroupRangeParseError,
    verdict::{TestVerdict, aggregate_verdict},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::debug;

/// A position in a source document, zero-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// The line number.
    pub line: u32,

    /// The character offset within the line.
    pub character: u32,
}

/// A range in a source document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// The start of the range.
    pub start: Position,

    /// The end of the range.
    pub end: Position,
}

/// The source location of a trace definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// The document URI.
    pub uri: String,

    /// The range within the document.
    pub range: Range,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Editors display one-based lines and columns.
        write!(
            f,
            "{}:{}:{}",
            self.uri,
            self.range.start.line + 1,
            self.range.start.character + 1
        )
    }
}

/// One step of a test sequence and the result the interpreter produced for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPair {
    /// The statement that was evaluated.
    pub case: String,

    /// The result, if any was produced.
    pub result: Option<String>,
}

/// A single concrete test generated from a trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// The one-based id of the test within its trace.
    pub id: u32,

    /// The verdict, or `None` if the test has not been executed.
    pub verdict: Option<TestVerdict>,

    /// The evaluated sequence.
    #[serde(default)]
    pub sequence: Vec<ResultPair>,
}

impl TestCase {
    /// Creates a new, not yet executed test case.
    pub fn pending(id: u32) -> Self {
        Self {
            id,
            verdict: None,
            sequence: Vec::new(),
        }
    }
}

/// A trace as reported by the test service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtTrace {
    /// The fully qualified trace name.
    pub name: String,

    /// Where the trace is defined.
    pub location: Option<Location>,

    /// A verdict the server may already know for the trace.
    #[serde(default)]
    pub verdict: Option<TestVerdict>,
}

/// A symbol (module or class) and its traces, as reported by the test service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtSymbol {
    /// The symbol name.
    pub name: String,

    /// Traces defined in the symbol, in source order.
    pub traces: Vec<CtTrace>,
}

/// A trace together with the results of its tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceWithTestResults {
    /// The fully qualified trace name.
    pub name: String,

    /// Where the trace is defined.
    pub location: Option<Location>,

    /// The aggregate verdict, computed when execution of the trace finishes.
    #[serde(default)]
    pub verdict: Option<TestVerdict>,

    /// Test cases, ordered by id.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl TraceWithTestResults {
    /// Creates an entry for a trace the server just reported, without any tests.
    pub fn from_server(trace: CtTrace) -> Self {
        Self {
            name: trace.name,
            location: trace.location,
            verdict: trace.verdict,
            test_cases: Vec::new(),
        }
    }

    /// Returns the number of tests for this trace.
    pub fn number_of_tests(&self) -> u32 {
        self.test_cases.len() as u32
    }

    /// Returns the id of the last test, if any tests exist.
    pub fn last_test_id(&self) -> Option<u32> {
        self.test_cases.last().map(|tc| tc.id)
    }

    /// Returns the tests in the given one-based inclusive range.
    ///
    /// The range is clamped to the tests that exist.
    pub fn test_results(&self, range: GroupRange) -> &[TestCase] {
        let len = self.test_cases.len();
        let start = (range.start.max(1) as usize - 1).min(len);
        let end = (range.end as usize).clamp(start, len);
        &self.test_cases[start..end]
    }

    /// Returns the aggregate verdict over all tests.
    pub fn aggregate_verdict(&self) -> Option<TestVerdict> {
        aggregate_verdict(self.test_cases.iter().map(|tc| tc.verdict))
    }
}

/// All tests for one symbol. This is the unit that gets persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCt {
    /// The symbol name.
    pub symbol_name: String,

    /// The symbol's traces.
    pub traces: Vec<TraceWithTestResults>,
}

/// An optionally bounded range of test ids sent with an execute request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberRange {
    /// The first test id, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,

    /// The last test id, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
}

/// Tracks the test ids that arrived since the view was last refreshed.
///
/// Both ends are zero while nothing is executing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestCaseBatchRange {
    /// The id at which the current batch started.
    pub start: u32,

    /// The last id received.
    pub end: u32,
}

impl TestCaseBatchRange {
    /// Returns the number of results received since the last refresh.
    pub fn pending(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

/// A contiguous, one-based, inclusive range of test ids displayed as one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupRange {
    /// The first test id.
    pub start: u32,

    /// The last test id.
    pub end: u32,
}

impl GroupRange {
    /// Returns the number of tests in this range.
    pub fn len(&self) -> u32 {
        (self.end + 1).saturating_sub(self.start)
    }

    /// Returns true if this range has no tests.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for GroupRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for GroupRange {
    type Err = GroupRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| GroupRangeParseError::new(s))?;
        let start = start
            .trim()
            .parse()
            .map_err(|_| GroupRangeParseError::new(s))?;
        let end = end
            .trim()
            .parse()
            .map_err(|_| GroupRangeParseError::new(s))?;
        Ok(Self { start, end })
    }
}

/// Partitions `1..=number_of_tests` into groups of `group_size`, the last one truncated.
///
/// A `group_size` of zero is treated as one.
pub fn group_ranges(number_of_tests: u32, group_size: u32) -> impl Iterator<Item = GroupRange> {
    let group_size = group_size.max(1);
    let groups = number_of_tests.div_ceil(group_size);
    (0..groups).map(move |i| {
        let start = i * group_size + 1;
        let end = ((i + 1) * group_size).min(number_of_tests);
        GroupRange { start, end }
    })
}

/// Reconciles locally cached tests against the symbols the server reports.
///
/// The result follows the server's order. Symbols and traces the server no longer reports are
/// dropped. New traces start without tests. Kept traces take the server's location, since the
/// definition may have moved.
pub fn match_local_symbols_to_server_symbols(
    server_symbols: Vec<CtSymbol>,
    mut local_symbols: Vec<CompleteCt>,
) -> Vec<CompleteCt> {
    server_symbols
        .into_iter()
        .map(|server_symbol| {
            let Some(index) = local_symbols
                .iter()
                .position(|ct| ct.symbol_name == server_symbol.name)
            else {
                debug!("new symbol `{}` reported by server", server_symbol.name);
                return CompleteCt {
                    symbol_name: server_symbol.name,
                    traces: server_symbol
                        .traces
                        .into_iter()
                        .map(TraceWithTestResults::from_server)
                        .collect(),
                };
            };

            let mut local_symbol = local_symbols.swap_remove(index);
            let mut local_traces = std::mem::take(&mut local_symbol.traces);
            local_symbol.traces = server_symbol
                .traces
                .into_iter()
                .map(|server_trace| {
                    match local_traces.iter().position(|t| t.name == server_trace.name) {
                        Some(index) => {
                            let mut local_trace = local_traces.swap_remove(index);
                            local_trace.location = server_trace.location;
                            local_trace
                        }
                        None => TraceWithTestResults::from_server(server_trace),
                    }
                })
                .collect();

            for dropped in &local_traces {
                debug!(
                    "dropping trace `{}` no longer reported by server",
                    dropped.name
                );
            }
            local_symbol
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case(0, 300, &[]; "no tests")]
    #[test_case(10, 300, &[(1, 10)]; "single truncated group")]
    #[test_case(300, 300, &[(1, 300)]; "exactly one group")]
    #[test_case(301, 300, &[(1, 300), (301, 301)]; "one spare test")]
    #[test_case(7, 3, &[(1, 3), (4, 6), (7, 7)]; "small groups")]
    fn partition(number_of_tests: u32, group_size: u32, expected: &[(u32, u32)]) {
        let actual: Vec<_> = group_ranges(number_of_tests, group_size)
            .map(|r| (r.start, r.end))
            .collect();
        assert_eq!(actual, expected);
    }

    #[proptest]
    fn partition_is_exact(
        #[strategy(0u32..5000)] number_of_tests: u32,
        #[strategy(1u32..700)] group_size: u32,
    ) {
        let groups: Vec<_> = group_ranges(number_of_tests, group_size).collect();
        let mut next = 1;
        for (i, group) in groups.iter().enumerate() {
            assert_eq!(group.start, next, "groups are contiguous");
            if i + 1 < groups.len() {
                assert_eq!(group.len(), group_size, "only the last group is truncated");
            } else {
                let rem = number_of_tests % group_size;
                let expected = if rem == 0 { group_size } else { rem };
                assert_eq!(group.len(), expected);
            }
            next = group.end + 1;
        }
        let total: u32 = groups.iter().map(GroupRange::len).sum();
        assert_eq!(total, number_of_tests);
    }

    #[test]
    fn group_range_description() {
        let range: GroupRange = "301-600".parse().unwrap();
        assert_eq!(range, GroupRange { start: 301, end: 600 });
        assert_eq!(range.to_string(), "301-600");
        "301".parse::<GroupRange>().expect_err("missing end");
        "a-b".parse::<GroupRange>().expect_err("not numbers");
    }

    #[test]
    fn test_results_clamp() {
        let trace = TraceWithTestResults {
            name: "T".to_owned(),
            location: None,
            verdict: None,
            test_cases: (1..=5).map(TestCase::pending).collect(),
        };
        let ids = |range| {
            trace
                .test_results(range)
                .iter()
                .map(|tc| tc.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(GroupRange { start: 2, end: 3 }), [2, 3]);
        assert_eq!(ids(GroupRange { start: 4, end: 300 }), [4, 5]);
        assert_eq!(ids(GroupRange { start: 9, end: 12 }), Vec::<u32>::new());
    }

    fn server_trace(name: &str, line: u32) -> CtTrace {
        CtTrace {
            name: name.to_owned(),
            location: Some(Location {
                uri: "file:///spec.vdmsl".to_owned(),
                range: Range {
                    start: Position { line, character: 0 },
                    end: Position { line, character: 4 },
                },
            }),
            verdict: None,
        }
    }

    #[test]
    fn reconcile_with_server() {
        let local = vec![CompleteCt {
            symbol_name: "A".to_owned(),
            traces: vec![
                TraceWithTestResults {
                    name: "A`T1".to_owned(),
                    location: None,
                    verdict: Some(TestVerdict::Passed),
                    test_cases: vec![TestCase::pending(1)],
                },
                TraceWithTestResults {
                    name: "A`Gone".to_owned(),
                    location: None,
                    verdict: None,
                    test_cases: vec![],
                },
            ],
        }];
        let server = vec![
            CtSymbol {
                name: "B".to_owned(),
                traces: vec![server_trace("B`T", 3)],
            },
            CtSymbol {
                name: "A".to_owned(),
                traces: vec![server_trace("A`T1", 10), server_trace("A`T2", 20)],
            },
        ];

        let merged = match_local_symbols_to_server_symbols(server, local);
        let names: Vec<_> = merged.iter().map(|ct| ct.symbol_name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);

        let a = &merged[1];
        let traces: Vec<_> = a.traces.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(traces, ["A`T1", "A`T2"]);
        assert_eq!(a.traces[0].test_cases, vec![TestCase::pending(1)]);
        assert_eq!(a.traces[0].verdict, Some(TestVerdict::Passed));
        assert_eq!(a.traces[0].location, server_trace("A`T1", 10).location);
        assert!(a.traces[1].test_cases.is_empty());
    }

    #[test]
    fn complete_ct_wire_format() {
        let json = r#"{"symbolName":"M","traces":[{"name":"M`T","location":null,"verdict":2,
            "testCases":[{"id":1,"verdict":2,"sequence":[{"case":"f(1)","result":null}]}]}]}"#;
        let ct: CompleteCt = serde_json::from_str(json).unwrap();
        assert_eq!(ct.traces[0].verdict, Some(TestVerdict::Failed));
        assert_eq!(ct.traces[0].test_cases[0].sequence[0].case, "f(1)");

        let value = serde_json::to_value(&ct).unwrap();
        assert_eq!(value["traces"][0]["testCases"][0]["verdict"], 2);
        assert_eq!(value["symbolName"], "M");
    }
}
