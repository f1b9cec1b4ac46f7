//! STLI session management

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    command::StliCommand,
    constants::{
        CLOSE_SUCCESS, DEFAULT_STLI_VERSION, LINE_TERMINATOR, MAKE_CALL_SUCCESS,
        MONITOR_START_SUCCESS, MONITOR_STOP_SUCCESS,
    },
    error::{StliError, StliResult},
    protocol::{expect_exact, CallInitiated, DeviceInformation, InitAck},
    terminal::{Address, Call, Terminal},
    trace::{NoTrace, ProtocolTrace},
    transport::LineTransport,
};

/// Session lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SessionState {
    /// No negotiation yet; the version may still change.
    Unconnected,
    /// `STLI;Version=` acknowledged; commands may be sent.
    Negotiated,
    /// `BYE` acknowledged and transport closed.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unconnected => write!(f, "unconnected"),
            SessionState::Negotiated => write!(f, "negotiated"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Options for STLI session configuration.
///
/// Use [`Default::default()`] for protocol version 2 without wire tracing.
#[derive(Clone)]
pub struct StliConnectOptions {
    /// Version requested during negotiation. Default: 2.
    pub version: u32,
    /// Observer for every line sent and received. Default: [`NoTrace`].
    pub trace: Arc<dyn ProtocolTrace>,
}

impl Default for StliConnectOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_STLI_VERSION,
            trace: Arc::new(NoTrace),
        }
    }
}

impl std::fmt::Debug for StliConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StliConnectOptions")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl StliConnectOptions {
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_trace(mut self, trace: impl ProtocolTrace + 'static) -> Self {
        self.trace = Arc::new(trace);
        self
    }
}

/// STLI protocol engine over an exclusively owned [`LineTransport`].
///
/// Every operation takes `&mut self`: STLI is a strictly sequential
/// request/response protocol and one operation must complete before the next
/// begins. After any protocol error the position in the response stream is
/// unknown; the only sensible follow-up is [`close`](Self::close).
pub struct StliConnection<T> {
    transport: T,
    version: u32,
    state: SessionState,
    negotiation: Option<InitAck>,
    trace: Arc<dyn ProtocolTrace>,
}

impl<T> std::fmt::Debug for StliConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StliConnection")
            .field("version", &self.version)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: LineTransport> StliConnection<T> {
    /// Engine with default options. Nothing is sent until [`connect`](Self::connect).
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, StliConnectOptions::default())
    }

    pub fn with_options(transport: T, options: StliConnectOptions) -> Self {
        Self {
            transport,
            version: options.version,
            state: SessionState::Unconnected,
            negotiation: None,
            trace: options.trace,
        }
    }

    /// Version requested (or negotiated, once connected).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Change the requested version. Only allowed before [`connect`](Self::connect).
    pub fn set_version(&mut self, version: u32) -> StliResult<()> {
        if self.state != SessionState::Unconnected {
            return Err(StliError::invalid_state(
                "cannot change version after connecting",
            ));
        }
        if version == 0 {
            return Err(StliError::invalid_argument(
                "protocol version must be positive",
            ));
        }
        self.version = version;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Parsed negotiation acknowledgment, once negotiated.
    pub fn negotiation(&self) -> Option<&InitAck> {
        self.negotiation
            .as_ref()
    }

    /// Whether the underlying transport is open.
    pub fn is_connected(&self) -> bool {
        self.transport
            .is_connected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give up the session and take the transport back.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn require_negotiated(&self, operation: &str) -> StliResult<()> {
        match self.state {
            SessionState::Negotiated => Ok(()),
            state => Err(StliError::invalid_state(format!(
                "{} requires a negotiated session (state: {})",
                operation, state
            ))),
        }
    }

    async fn send(&mut self, command: &StliCommand) -> StliResult<()> {
        let line = command.to_line()?;
        debug!("Sending command: {}", line);
        self.trace
            .on_sent(&line);
        let mut wire = line;
        wire.push_str(LINE_TERMINATOR);
        self.transport
            .write_line(&wire)
            .await
    }

    async fn recv(&mut self) -> StliResult<String> {
        let line = self
            .transport
            .read_line()
            .await?;
        debug!("Received response: {}", line);
        self.trace
            .on_received(&line);
        Ok(line)
    }

    /// Write one command and read its immediate response.
    async fn exchange(&mut self, command: StliCommand) -> StliResult<String> {
        self.send(&command)
            .await?;
        self.recv()
            .await
    }

    /// Open the transport and negotiate the protocol version.
    ///
    /// Returns the raw acknowledgment line. The session stays
    /// [`Unconnected`](SessionState::Unconnected) on any failure.
    pub async fn connect(&mut self) -> StliResult<String> {
        if self.state != SessionState::Unconnected {
            return Err(StliError::invalid_state(format!(
                "cannot negotiate a session that is already {}",
                self.state
            )));
        }

        self.transport
            .connect()
            .await?;

        let response = self
            .exchange(StliCommand::Init {
                version: self.version,
            })
            .await?;

        let Some(ack) = InitAck::parse(&response) else {
            warn!("Unrecognized negotiation response: {}", response);
            return Err(StliError::UnrecognizedInitResponse { response });
        };

        if !ack.is_success() {
            warn!("STLI negotiation rejected with status {}", ack.status);
            return Err(StliError::NegotiationFailed {
                status: ack.status,
                response,
            });
        }

        if let Some(reported) = ack.version() {
            if reported != i64::from(self.version) {
                warn!(
                    "Requested STLI version {} but server acknowledged {}",
                    self.version, reported
                );
            }
        }

        info!("STLI session negotiated (version {})", self.version);
        self.negotiation = Some(ack);
        self.state = SessionState::Negotiated;
        Ok(response)
    }

    /// End the session with `BYE` and close the transport.
    ///
    /// The transport is only closed once the server acknowledged `BYE`;
    /// a mismatched reply leaves it open and the state unchanged.
    pub async fn close(&mut self) -> StliResult<()> {
        self.require_negotiated("close")?;

        let response = self
            .exchange(StliCommand::Bye)
            .await?;
        expect_exact(CLOSE_SUCCESS, &response)?;

        info!("STLI session closed");
        self.state = SessionState::Closed;
        self.transport
            .close()
            .await
    }

    /// Originate a call from `terminal` to `destination`.
    ///
    /// On an observed terminal the server follows the acknowledgment with an
    /// `Initiated` and a `DeviceInformation` notification, in that order; both
    /// are consumed and validated here. No [`Call`] is returned unless every
    /// line validates.
    pub async fn create_call(
        &mut self,
        terminal: &Terminal,
        destination: &Address,
    ) -> StliResult<Call> {
        self.require_negotiated("MakeCall")?;

        let response = self
            .exchange(StliCommand::MakeCall {
                from: terminal
                    .attached_number()
                    .to_string(),
                to: destination
                    .number()
                    .to_string(),
            })
            .await?;
        expect_exact(MAKE_CALL_SUCCESS, &response)?;

        if terminal.is_observed() {
            let line = self
                .recv()
                .await?;
            let initiated = CallInitiated::parse(&line)?;
            debug!(
                "Call initiated (seq {}): {} -> {}",
                initiated.sequence, initiated.calling, initiated.called
            );

            let line = self
                .recv()
                .await?;
            let device = DeviceInformation::parse(&line)?;
            debug!(
                "Device information (seq {}): {} ({})",
                device.sequence, device.code, device.description
            );
        }

        Ok(Call::new(terminal.address().clone(), destination.clone()))
    }

    /// Start (`enable = true`) or stop observing `terminal`.
    ///
    /// Returns `Ok(true)` and updates the terminal's observed flag when the
    /// server acknowledges. An unexpected acknowledgment is reported as
    /// `Ok(false)` and leaves the flag untouched. So is an attached number
    /// that cannot be put on the wire (empty, or containing whitespace); in
    /// that case nothing is sent. Only transport and state failures are
    /// errors.
    pub async fn observe_terminal(
        &mut self,
        terminal: &mut Terminal,
        enable: bool,
    ) -> StliResult<bool> {
        let device = terminal
            .attached_number()
            .to_string();
        let (command, expected) = if enable {
            (StliCommand::MonitorStart { device }, MONITOR_START_SUCCESS)
        } else {
            (StliCommand::MonitorStop { device }, MONITOR_STOP_SUCCESS)
        };
        self.require_negotiated(command.name())?;
        if let Err(e) = command.to_line() {
            warn!("Not sending {}: {}", command.name(), e);
            return Ok(false);
        }

        let response = self
            .exchange(command)
            .await?;
        if let Err(e) = expect_exact(expected, &response) {
            warn!("{}", e);
            return Ok(false);
        }

        terminal.set_observed(enable);
        Ok(true)
    }

    /// Wrap `address` in an unobserved [`Terminal`]. No protocol traffic.
    pub fn get_terminal(&self, address: Address) -> Terminal {
        Terminal::new(address)
    }

    /// Release a terminal. STLI has no release command; always succeeds.
    pub fn release_terminal(&mut self, _terminal: &Terminal) -> bool {
        true
    }
}
