//! Command formatting

use crate::{
    constants::{
        CLOSE_COMMAND, INIT_COMMAND, MAKE_CALL_COMMAND, MONITOR_START_COMMAND,
        MONITOR_STOP_COMMAND,
    },
    error::{StliError, StliResult},
    protocol::{tokenize, Segment},
};
use std::fmt;

/// Validate that a user-provided string can occupy one positional slot.
///
/// STLI commands are line-delimited and whitespace-separated; embedded
/// newlines would allow injection of arbitrary commands and embedded spaces
/// would shift every following field.
fn validate_token(s: &str, context: &str) -> StliResult<()> {
    if s.is_empty() {
        return Err(StliError::invalid_argument(format!(
            "{} must not be empty",
            context
        )));
    }
    if s.contains('\n') || s.contains('\r') {
        return Err(StliError::invalid_argument(format!(
            "{} must not contain newlines",
            context
        )));
    }
    if s.contains(char::is_whitespace) {
        return Err(StliError::invalid_argument(format!(
            "{} must not contain whitespace",
            context
        )));
    }
    Ok(())
}

/// Positional argument for [`format_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    /// Fills a `%d` placeholder.
    Int(i64),
    /// Fills a `%s` placeholder.
    Str(&'a str),
}

impl fmt::Display for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(n) => write!(f, "{}", n),
            Arg::Str(s) => f.write_str(s),
        }
    }
}

/// Render a `%d`/`%s` template into a single protocol line.
///
/// Template whitespace is emitted as a single space. The result never
/// carries a line terminator.
///
/// ```
/// use stli_tokio::command::{format_line, Arg};
///
/// let line = format_line("MakeCall %s %s", &[Arg::Str("201"), Arg::Str("5551234")]).unwrap();
/// assert_eq!(line, "MakeCall 201 5551234");
/// assert!(format_line("MakeCall %s %s", &[Arg::Str("201")]).is_err());
/// ```
pub fn format_line(template: &str, args: &[Arg<'_>]) -> StliResult<String> {
    use std::fmt::Write;

    let mut line = String::with_capacity(template.len() + 16);
    let mut args = args.iter();

    for segment in tokenize(template) {
        match segment {
            Segment::Literal(text) => line.push_str(&text),
            Segment::Space => line.push(' '),
            Segment::Int => match args.next() {
                Some(Arg::Int(n)) => {
                    let _ = write!(line, "{}", n);
                }
                Some(other) => {
                    return Err(StliError::invalid_argument(format!(
                        "'{}' expects an integer for %d, got '{}'",
                        template, other
                    )))
                }
                None => {
                    return Err(StliError::invalid_argument(format!(
                        "'{}' is missing arguments",
                        template
                    )))
                }
            },
            Segment::Str => match args.next() {
                Some(Arg::Str(s)) => {
                    validate_token(s, "argument")?;
                    line.push_str(s);
                }
                Some(other) => {
                    return Err(StliError::invalid_argument(format!(
                        "'{}' expects a string for %s, got '{}'",
                        template, other
                    )))
                }
                None => {
                    return Err(StliError::invalid_argument(format!(
                        "'{}' is missing arguments",
                        template
                    )))
                }
            },
        }
    }

    if args
        .next()
        .is_some()
    {
        return Err(StliError::invalid_argument(format!(
            "'{}' was given too many arguments",
            template
        )));
    }

    Ok(line)
}

/// STLI commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StliCommand {
    /// Session negotiation
    Init { version: u32 },
    /// End of session
    Bye,
    /// Start observing a device
    MonitorStart { device: String },
    /// Stop observing a device
    MonitorStop { device: String },
    /// Originate a call from `from` to `to`
    MakeCall { from: String, to: String },
}

impl StliCommand {
    /// Command keyword, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            StliCommand::Init { .. } => "STLI",
            StliCommand::Bye => "BYE",
            StliCommand::MonitorStart { .. } => "MonitorStart",
            StliCommand::MonitorStop { .. } => "MonitorStop",
            StliCommand::MakeCall { .. } => "MakeCall",
        }
    }

    /// Render the command line, without terminator.
    pub fn to_line(&self) -> StliResult<String> {
        match self {
            StliCommand::Init { version } => {
                format_line(INIT_COMMAND, &[Arg::Int(i64::from(*version))])
            }
            StliCommand::Bye => format_line(CLOSE_COMMAND, &[]),
            StliCommand::MonitorStart { device } => {
                validate_token(device, "monitored device")?;
                format_line(MONITOR_START_COMMAND, &[Arg::Str(device)])
            }
            StliCommand::MonitorStop { device } => {
                validate_token(device, "monitored device")?;
                format_line(MONITOR_STOP_COMMAND, &[Arg::Str(device)])
            }
            StliCommand::MakeCall { from, to } => {
                validate_token(from, "calling number")?;
                validate_token(to, "called number")?;
                format_line(MAKE_CALL_COMMAND, &[Arg::Str(from), Arg::Str(to)])
            }
        }
    }
}

impl fmt::Display for StliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_line() {
            Ok(line) => f.write_str(&line),
            Err(_) => write!(f, "{} <invalid>", self.name()),
        }
    }
}
