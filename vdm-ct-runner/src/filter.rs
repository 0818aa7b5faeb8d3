// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution filter options sent along with filtered execute requests.

use crate::errors::{FilterInputError, ReductionParseError};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How the test service reduces the set of generated tests before executing them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReductionType {
    /// Pick a random subset.
    #[default]
    Random,

    /// Keep one test per shape, ignoring variables.
    NoVariables,

    /// Keep one test per shape, distinguishing variable names.
    VariableNames,

    /// Keep one test per shape, distinguishing variable values.
    VariableValue,
}

impl ReductionType {
    /// All reduction types, in display order.
    pub const ALL: [ReductionType; 4] = [
        ReductionType::Random,
        ReductionType::NoVariables,
        ReductionType::VariableNames,
        ReductionType::VariableValue,
    ];

    /// Returns the short name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            ReductionType::Random => "R",
            ReductionType::NoVariables => "NV",
            ReductionType::VariableNames => "VN",
            ReductionType::VariableValue => "VV",
        }
    }

    /// Returns the human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            ReductionType::Random => "Random",
            ReductionType::NoVariables => "No variables",
            ReductionType::VariableNames => "Variable names",
            ReductionType::VariableValue => "Variable value",
        }
    }
}

impl fmt::Display for ReductionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ReductionType {
    type Err = ReductionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReductionType::ALL
            .into_iter()
            .find(|r| r.wire_name().eq_ignore_ascii_case(s) || r.display_name() == s)
            .ok_or_else(|| ReductionParseError::new(s))
    }
}

/// The value of a single filter option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A string value.
    String(String),

    /// A numeric value.
    Number(u64),

    /// A boolean value.
    Bool(bool),
}

/// A key/value pair attached to an execute request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    /// The option name.
    pub key: String,

    /// The option value.
    pub value: FilterValue,
}

/// The options of a filtered execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionFilter {
    /// The reduction type.
    pub reduction: ReductionType,

    /// The seed for random reduction, always positive.
    pub seed: u64,

    /// The percentage of tests to keep, between 1 and 100.
    pub limit: u8,
}

impl Default for ExecutionFilter {
    fn default() -> Self {
        Self {
            reduction: ReductionType::Random,
            seed: 999,
            limit: 100,
        }
    }
}

impl ExecutionFilter {
    /// Converts the filter to the key/value pairs the test service expects.
    pub fn to_options(&self) -> Vec<FilterOption> {
        vec![
            FilterOption {
                key: "reduction".to_owned(),
                value: FilterValue::String(self.reduction.wire_name().to_owned()),
            },
            FilterOption {
                key: "seed".to_owned(),
                value: FilterValue::Number(self.seed),
            },
            FilterOption {
                key: "limit".to_owned(),
                value: FilterValue::Number(u64::from(self.limit)),
            },
        ]
    }
}

/// Validates user input for the trace filtering seed.
pub fn parse_seed(input: &str) -> Result<u64, FilterInputError> {
    let value = parse_integer(input)?;
    if value <= 0.0 {
        return Err(FilterInputError::NotPositive);
    }
    // Floats lose precision past 2^53, so exact digits are taken as written.
    match input.trim().parse::<u64>() {
        Ok(seed) => Ok(seed),
        // u64::MAX rounds up to 2^64, the first value that does not fit.
        Err(_) if value < u64::MAX as f64 => Ok(value as u64),
        Err(_) => Err(FilterInputError::NotANumber),
    }
}

/// Validates user input for the subset limitation percentage.
pub fn parse_limit(input: &str) -> Result<u8, FilterInputError> {
    let value = parse_integer(input)?;
    if (1.0..=100.0).contains(&value) {
        Ok(value as u8)
    } else {
        Err(FilterInputError::OutOfRange)
    }
}

// Numbers are validated as floats first so that "2.5" reports a non-integer rather than garbage.
fn parse_integer(input: &str) -> Result<f64, FilterInputError> {
    let input = input.trim();
    let value = if input.is_empty() {
        // An empty box counts as zero.
        0.0
    } else {
        input
            .parse::<f64>()
            .map_err(|_| FilterInputError::NotANumber)?
    };
    if !value.is_finite() {
        return Err(FilterInputError::NotANumber);
    }
    if value.fract() != 0.0 {
        return Err(FilterInputError::NotAnInteger);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("999", Ok(999); "valid")]
    #[test_case("abc", Err(FilterInputError::NotANumber); "not a number")]
    #[test_case("2.5", Err(FilterInputError::NotAnInteger); "fraction")]
    #[test_case("0", Err(FilterInputError::NotPositive); "zero")]
    #[test_case("-4", Err(FilterInputError::NotPositive); "negative")]
    #[test_case("", Err(FilterInputError::NotPositive); "empty")]
    #[test_case("1e3", Ok(1000); "exponent")]
    #[test_case("18446744073709551615", Ok(u64::MAX); "largest")]
    #[test_case("18446744073709551616", Err(FilterInputError::NotANumber); "one past largest")]
    #[test_case("1e30", Err(FilterInputError::NotANumber); "too large")]
    fn seed(input: &str, expected: Result<u64, FilterInputError>) {
        assert_eq!(parse_seed(input), expected);
    }

    #[test_case("1", Ok(1); "lower bound")]
    #[test_case("100", Ok(100); "upper bound")]
    #[test_case("101", Err(FilterInputError::OutOfRange); "too large")]
    #[test_case("0", Err(FilterInputError::OutOfRange); "too small")]
    #[test_case("50.5", Err(FilterInputError::NotAnInteger); "fraction")]
    fn limit(input: &str, expected: Result<u8, FilterInputError>) {
        assert_eq!(parse_limit(input), expected);
    }

    #[test]
    fn messages() {
        assert_eq!(
            FilterInputError::NotANumber.to_string(),
            "Invalid input: Not a number"
        );
        assert_eq!(
            FilterInputError::OutOfRange.to_string(),
            "Invalid input: Not between 1-100"
        );
    }

    #[test]
    fn default_options() {
        let options = serde_json::to_value(ExecutionFilter::default().to_options()).unwrap();
        assert_eq!(
            options,
            serde_json::json!([
                {"key": "reduction", "value": "R"},
                {"key": "seed", "value": 999},
                {"key": "limit", "value": 100},
            ])
        );
    }

    #[test]
    fn reduction_names() {
        assert_eq!("VN".parse::<ReductionType>().unwrap(), ReductionType::VariableNames);
        assert_eq!(
            "No variables".parse::<ReductionType>().unwrap(),
            ReductionType::NoVariables
        );
        "shapes".parse::<ReductionType>().expect_err("unknown reduction");
    }
}
