//! STLI response validation: exact matching, positional pattern scanning and
//! typed views of the lines the engine consumes.

use crate::{
    constants::{
        CALL_INITIATED_NOTICE, DEVICE_INFORMATION_NOTICE, INIT_ACK_FEATURES, INIT_ACK_QUOTED,
        STATUS_SUCCESS,
    },
    error::{StliError, StliResult},
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One piece of a `%`-template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    /// A run of whitespace in the template.
    Space,
    /// `%d`
    Int,
    /// `%s`
    Str,
}

impl Segment {
    fn is_field(&self) -> bool {
        matches!(self, Segment::Int | Segment::Str)
    }
}

/// Split a template into literal text, whitespace runs and placeholders.
///
/// `%%` yields a literal percent. An unknown `%x` sequence is kept as literal
/// text so a malformed template can only fail to match, never panic.
pub(crate) fn tokenize(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template
        .chars()
        .peekable();

    fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(literal)));
        }
    }

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            flush(&mut literal, &mut segments);
            while chars
                .peek()
                .is_some_and(|n| n.is_whitespace())
            {
                chars.next();
            }
            segments.push(Segment::Space);
            continue;
        }
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.peek() {
            Some('d') => {
                chars.next();
                flush(&mut literal, &mut segments);
                segments.push(Segment::Int);
            }
            Some('s') => {
                chars.next();
                flush(&mut literal, &mut segments);
                segments.push(Segment::Str);
            }
            Some('%') => {
                chars.next();
                literal.push('%');
            }
            _ => literal.push('%'),
        }
    }
    flush(&mut literal, &mut segments);
    segments
}

/// A value captured by a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(i64),
    Str(String),
}

impl Field {
    /// Integer value, if this field came from `%d`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Field::Int(n) => Some(*n),
            Field::Str(_) => None,
        }
    }

    /// String value, if this field came from `%s`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            Field::Int(_) => None,
        }
    }
}

/// Scanf-style positional pattern.
///
/// - `%d` captures an optionally signed decimal integer
/// - `%s` captures a non-empty run of non-whitespace
/// - whitespace in the template matches one or more whitespace characters
/// - anything else must match literally
///
/// A line matching the whole template is preferred. Failing that, matching
/// follows scanf: it stops after the last field, so trailing literals and any
/// extra text are ignored. Either way it is all-or-nothing: a line that yields
/// only some of the fields is a failure.
///
/// ```
/// use stli_tokio::protocol::{Field, Pattern};
///
/// let p = Pattern::new("DeviceInformation %d %d (%s)");
/// let fields = p.capture("DeviceInformation 7 0 (Idle)").unwrap();
/// assert_eq!(fields[2], Field::Str("Idle".into()));
/// assert!(p.capture("DeviceInformation 7 0").is_none());
///
/// let fields = p.capture("DeviceInformation 7 0 (Call Delivered)").unwrap();
/// assert_eq!(fields[2], Field::Str("Call".into()));
/// ```
#[derive(Debug, Clone)]
pub struct Pattern {
    template: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            segments: tokenize(template),
        }
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of fields a successful match yields.
    pub fn field_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.is_field())
            .count()
    }

    /// Match `line`, returning every captured field in order, or `None`.
    pub fn capture(&self, line: &str) -> Option<Vec<Field>> {
        let line = line.trim_end();
        let mut fields = Vec::with_capacity(self.field_count());
        if match_from(&self.segments, line, &mut fields, true) {
            return Some(fields);
        }
        fields.clear();
        if match_from(&self.segments, line, &mut fields, false) {
            Some(fields)
        } else {
            None
        }
    }

    /// Like [`capture`](Self::capture) but failing with
    /// [`StliError::PatternMismatch`].
    pub fn expect(&self, line: &str) -> StliResult<Vec<Field>> {
        self.capture(line)
            .ok_or_else(|| StliError::PatternMismatch {
                pattern: self
                    .template
                    .clone(),
                actual: line.to_string(),
            })
    }
}

fn leading_whitespace(input: &str) -> usize {
    input.len()
        - input
            .trim_start()
            .len()
}

fn leading_non_whitespace(input: &str) -> usize {
    input
        .find(char::is_whitespace)
        .unwrap_or(input.len())
}

fn leading_integer(input: &str) -> usize {
    let bytes = input.as_bytes();
    let sign = usize::from(matches!(bytes.first(), Some(b'+') | Some(b'-')));
    let digits = bytes[sign..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        0
    } else {
        sign + digits
    }
}

/// Backtracking matcher. Only `%s` backtracks; everything else is greedy.
///
/// With `full` unset, matching succeeds as soon as no field is left to
/// capture.
fn match_from(segments: &[Segment], input: &str, fields: &mut Vec<Field>, full: bool) -> bool {
    if !full
        && !segments
            .iter()
            .any(Segment::is_field)
    {
        return true;
    }
    let Some((segment, rest)) = segments.split_first() else {
        return input.is_empty();
    };

    match segment {
        Segment::Literal(text) => input
            .strip_prefix(text.as_str())
            .is_some_and(|remaining| match_from(rest, remaining, fields, full)),
        Segment::Space => {
            let n = leading_whitespace(input);
            n > 0 && match_from(rest, &input[n..], fields, full)
        }
        Segment::Int => {
            let n = leading_integer(input);
            if n == 0 {
                return false;
            }
            let Ok(value) = input[..n].parse::<i64>() else {
                return false;
            };
            fields.push(Field::Int(value));
            if match_from(rest, &input[n..], fields, full) {
                return true;
            }
            fields.pop();
            false
        }
        Segment::Str => {
            let max = leading_non_whitespace(input);
            let mut ends: Vec<usize> = input[..max]
                .char_indices()
                .map(|(i, c)| i + c.len_utf8())
                .collect();
            ends.reverse();
            for end in ends {
                fields.push(Field::Str(input[..end].to_string()));
                if match_from(rest, &input[end..], fields, full) {
                    return true;
                }
                fields.pop();
            }
            false
        }
    }
}

macro_rules! cached_pattern {
    ($name:ident, $template:expr) => {
        fn $name() -> &'static Pattern {
            static PATTERN: OnceLock<Pattern> = OnceLock::new();
            PATTERN.get_or_init(|| Pattern::new($template))
        }
    };
}

cached_pattern!(init_ack_quoted, INIT_ACK_QUOTED);
cached_pattern!(init_ack_features, INIT_ACK_FEATURES);
cached_pattern!(call_initiated, CALL_INITIATED_NOTICE);
cached_pattern!(device_information, DEVICE_INFORMATION_NOTICE);

/// Exact comparison of a received line against an expected acknowledgment.
pub fn expect_exact(expected: &str, actual: &str) -> StliResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(StliError::UnexpectedResponse {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Payload following the `STLI` token of a negotiation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitDetail {
    /// `STLI Version "<n>"`
    Version(i64),
    /// `STLI;<feature list>`, the text after the semicolon.
    Features(String),
}

/// Parsed negotiation acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitAck {
    /// Raw status token.
    pub status: String,
    pub detail: InitDetail,
}

impl InitAck {
    /// Try the quoted-version shape, then the feature-list shape.
    ///
    /// Returns `None` when neither shape captures all of its fields.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(fields) = init_ack_quoted().capture(line) {
            if let [Field::Str(status), Field::Int(version)] = fields.as_slice() {
                return Some(Self {
                    status: status.clone(),
                    detail: InitDetail::Version(*version),
                });
            }
        }
        if let Some(fields) = init_ack_features().capture(line) {
            if let [Field::Str(status), Field::Str(features)] = fields.as_slice() {
                return Some(Self {
                    status: status.clone(),
                    detail: InitDetail::Features(features.clone()),
                });
            }
        }
        None
    }

    /// `true` only for the exact `SUCCESS` token.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Version reported by the server, quoted shape only.
    pub fn version(&self) -> Option<i64> {
        match self.detail {
            InitDetail::Version(v) => Some(v),
            InitDetail::Features(_) => None,
        }
    }
}

/// `Initiated <seq> makeCall <calling> <called>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInitiated {
    pub sequence: i64,
    pub calling: String,
    pub called: String,
}

impl CallInitiated {
    /// Validate a notification line.
    pub fn parse(line: &str) -> StliResult<Self> {
        let pattern = call_initiated();
        match pattern
            .expect(line)?
            .as_slice()
        {
            [Field::Int(sequence), Field::Str(calling), Field::Str(called)] => Ok(Self {
                sequence: *sequence,
                calling: calling.clone(),
                called: called.clone(),
            }),
            _ => Err(StliError::PatternMismatch {
                pattern: pattern
                    .template()
                    .to_string(),
                actual: line.to_string(),
            }),
        }
    }
}

/// `DeviceInformation <seq> <code> (<description>)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInformation {
    pub sequence: i64,
    pub code: i64,
    pub description: String,
}

impl DeviceInformation {
    /// Validate a notification line.
    pub fn parse(line: &str) -> StliResult<Self> {
        let pattern = device_information();
        match pattern
            .expect(line)?
            .as_slice()
        {
            [Field::Int(sequence), Field::Int(code), Field::Str(description)] => Ok(Self {
                sequence: *sequence,
                code: *code,
                description: description.clone(),
            }),
            _ => Err(StliError::PatternMismatch {
                pattern: pattern
                    .template()
                    .to_string(),
                actual: line.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_template() {
        assert_eq!(
            tokenize("MakeCall %s %s"),
            vec![
                Segment::Literal("MakeCall".into()),
                Segment::Space,
                Segment::Str,
                Segment::Space,
                Segment::Str,
            ]
        );
        assert_eq!(
            tokenize("STLI;Version=%d"),
            vec![Segment::Literal("STLI;Version=".into()), Segment::Int]
        );
        assert_eq!(
            tokenize("100%% %q"),
            vec![
                Segment::Literal("100%".into()),
                Segment::Space,
                Segment::Literal("%q".into()),
            ]
        );
    }

    #[test]
    fn call_initiated_captures_all_fields() {
        let fields = Pattern::new(CALL_INITIATED_NOTICE)
            .capture("Initiated 12 makeCall 201 5551234")
            .unwrap();
        assert_eq!(
            fields,
            vec![
                Field::Int(12),
                Field::Str("201".into()),
                Field::Str("5551234".into()),
            ]
        );
    }

    #[test]
    fn missing_field_is_total_failure() {
        let p = Pattern::new(CALL_INITIATED_NOTICE);
        assert!(p
            .capture("Initiated 12 makeCall 201")
            .is_none());
        assert!(p
            .capture("Initiated x makeCall 201 202")
            .is_none());
        assert!(p
            .capture("Initiated 12 dropCall 201 202")
            .is_none());
    }

    #[test]
    fn text_after_last_field_ignored() {
        let p = Pattern::new(CALL_INITIATED_NOTICE);
        let fields = p
            .capture("Initiated 12 makeCall 201 202 203")
            .unwrap();
        assert_eq!(
            fields,
            vec![
                Field::Int(12),
                Field::Str("201".into()),
                Field::Str("202".into()),
            ]
        );
        assert!(p
            .capture("Initiated 12 makeCall 201 202  ")
            .is_some());
        assert!(CallInitiated::parse("Initiated 4 makeCall 201 202 extra").is_ok());
    }

    #[test]
    fn parenthesised_string_backtracks() {
        let info = DeviceInformation::parse("DeviceInformation 3 0 (Connected)").unwrap();
        assert_eq!(info.sequence, 3);
        assert_eq!(info.code, 0);
        assert_eq!(info.description, "Connected");

        assert!(DeviceInformation::parse("DeviceInformation 3 0 (").is_err());
        assert!(DeviceInformation::parse("DeviceInformation 3 0 Connected").is_err());
    }

    #[test]
    fn trailing_literal_after_last_field_optional() {
        let info = DeviceInformation::parse("DeviceInformation 5 0 (Call Delivered)").unwrap();
        assert_eq!(info.sequence, 5);
        assert_eq!(info.description, "Call");

        let info = DeviceInformation::parse("DeviceInformation 5 0 (Idle").unwrap();
        assert_eq!(info.description, "Idle");
    }

    #[test]
    fn signed_integers() {
        let fields = Pattern::new("value %d")
            .capture("value -42")
            .unwrap();
        assert_eq!(fields[0].as_int(), Some(-42));
        assert!(Pattern::new("value %d")
            .capture("value -")
            .is_none());
    }

    #[test]
    fn pattern_expect_reports_template() {
        let err = CallInitiated::parse("DeviceInformation 1 2 (x)").unwrap_err();
        match err {
            StliError::PatternMismatch { pattern, actual } => {
                assert_eq!(pattern, CALL_INITIATED_NOTICE);
                assert_eq!(actual, "DeviceInformation 1 2 (x)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn exact_match() {
        assert!(expect_exact("error_ind SUCCESS BYE", "error_ind SUCCESS BYE").is_ok());
        let err = expect_exact("error_ind SUCCESS BYE", "error_ind SUCCESS BYE ").unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn init_ack_quoted_shape() {
        let ack = InitAck::parse("error_ind SUCCESS STLI Version \"2\"").unwrap();
        assert_eq!(ack.status, "SUCCESS");
        assert_eq!(ack.detail, InitDetail::Version(2));
        assert!(ack.is_success());
    }

    #[test]
    fn init_ack_feature_shape() {
        let ack = InitAck::parse("error_ind SUCCESS STLI;Version=2;Features=MonitorCalls").unwrap();
        assert_eq!(
            ack.detail,
            InitDetail::Features("Version=2;Features=MonitorCalls".into())
        );
        assert!(ack.is_success());
        assert_eq!(ack.version(), None);

        let ack = InitAck::parse("error_ind SUCCESS STLI;Version=2; Features=MakeCall").unwrap();
        assert_eq!(ack.detail, InitDetail::Features("Version=2;".into()));
        assert!(ack.is_success());
    }

    #[test]
    fn cached_patterns_compiled_once() {
        assert!(std::ptr::eq(call_initiated(), call_initiated()));
        assert_eq!(device_information().template(), DEVICE_INFORMATION_NOTICE);
    }

    #[test]
    fn init_ack_failure_status() {
        let ack = InitAck::parse("error_ind FAILURE STLI Version \"2\"").unwrap();
        assert!(!ack.is_success());
        let ack = InitAck::parse("error_ind success STLI Version \"2\"").unwrap();
        assert!(!ack.is_success());
    }

    #[test]
    fn init_ack_unrecognized() {
        assert!(InitAck::parse("garbage").is_none());
        assert!(InitAck::parse("error_ind SUCCESS STLI").is_none());
        assert!(InitAck::parse("error_ind SUCCESS STLI;").is_none());
        assert!(InitAck::parse("error_ind SUCCESS STLI Version 2").is_none());
    }
}
