//! Protocol-independent CTI provider interface.

use std::future::Future;

use crate::{
    connection::StliConnection,
    error::StliResult,
    terminal::{Address, Call, Terminal},
    transport::LineTransport,
};

/// Capability set shared by CTI protocol drivers.
///
/// [`StliConnection`] is the STLI implementation; other protocols can provide
/// their own behind the same interface.
pub trait CtiProvider: Send {
    /// Open the session. Returns the server's raw greeting/acknowledgment.
    fn connect(&mut self) -> impl Future<Output = StliResult<String>> + Send;

    /// End the session.
    fn close(&mut self) -> impl Future<Output = StliResult<()>> + Send;

    /// Originate a call from `terminal` to `destination`.
    fn create_call(
        &mut self,
        terminal: &Terminal,
        destination: &Address,
    ) -> impl Future<Output = StliResult<Call>> + Send;

    /// Obtain a terminal handle for `address`.
    fn get_terminal(&self, address: Address) -> Terminal;

    /// Start or stop observing `terminal`; `Ok(false)` if the server declined.
    fn observe_terminal(
        &mut self,
        terminal: &mut Terminal,
        enable: bool,
    ) -> impl Future<Output = StliResult<bool>> + Send;

    /// Release a terminal handle.
    fn release_terminal(&mut self, terminal: &Terminal) -> bool;
}

impl<T: LineTransport> CtiProvider for StliConnection<T> {
    fn connect(&mut self) -> impl Future<Output = StliResult<String>> + Send {
        StliConnection::connect(self)
    }

    fn close(&mut self) -> impl Future<Output = StliResult<()>> + Send {
        StliConnection::close(self)
    }

    fn create_call(
        &mut self,
        terminal: &Terminal,
        destination: &Address,
    ) -> impl Future<Output = StliResult<Call>> + Send {
        StliConnection::create_call(self, terminal, destination)
    }

    fn get_terminal(&self, address: Address) -> Terminal {
        StliConnection::get_terminal(self, address)
    }

    fn observe_terminal(
        &mut self,
        terminal: &mut Terminal,
        enable: bool,
    ) -> impl Future<Output = StliResult<bool>> + Send {
        StliConnection::observe_terminal(self, terminal, enable)
    }

    fn release_terminal(&mut self, terminal: &Terminal) -> bool {
        StliConnection::release_terminal(self, terminal)
    }
}
