//! Protocol constants and configuration values

/// STLI protocol version 2, the only version currently defined.
pub const STLI_VERSION_2: u32 = 2;

/// Version requested at connect time unless overridden.
pub const DEFAULT_STLI_VERSION: u32 = STLI_VERSION_2;

/// Record terminator appended to every command line.
pub const LINE_TERMINATOR: &str = "\n";

/// TCP connect timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Maximum length of a single response line (64KB).
/// No STLI response comes anywhere near this; exceeding it means desync.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Reply status token that marks a successful acknowledgment.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Session negotiation command.
pub const INIT_COMMAND: &str = "STLI;Version=%d";
/// Canonical negotiation acknowledgment for a given version.
pub const INIT_SUCCESS: &str = "error_ind SUCCESS STLI Version \"%d\"";

/// Negotiation acknowledgment, quoted-version shape. Tried first.
pub const INIT_ACK_QUOTED: &str = "error_ind %s STLI Version \"%d\"";
/// Negotiation acknowledgment, semicolon feature-list shape.
pub const INIT_ACK_FEATURES: &str = "error_ind %s STLI;%s";

/// Session termination.
pub const CLOSE_COMMAND: &str = "BYE";
pub const CLOSE_SUCCESS: &str = "error_ind SUCCESS BYE";

/// Terminal observation.
pub const MONITOR_START_COMMAND: &str = "MonitorStart %s";
pub const MONITOR_START_SUCCESS: &str = "error_ind SUCCESS MonitorStart";
pub const MONITOR_STOP_COMMAND: &str = "MonitorStop %s";
pub const MONITOR_STOP_SUCCESS: &str = "error_ind SUCCESS MonitorStop";

/// Call origination.
pub const MAKE_CALL_COMMAND: &str = "MakeCall %s %s";
pub const MAKE_CALL_SUCCESS: &str = "error_ind SUCCESS MakeCall";

/// Notification emitted after MakeCall on an observed terminal.
pub const CALL_INITIATED_NOTICE: &str = "Initiated %d makeCall %s %s";
/// Notification following [`CALL_INITIATED_NOTICE`].
pub const DEVICE_INFORMATION_NOTICE: &str = "DeviceInformation %d %d (%s)";
