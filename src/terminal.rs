//! Telephony value types exchanged with the connection engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dialable number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    number: String,
}

impl Address {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
        }
    }

    /// The number as dialled on the wire.
    pub fn number(&self) -> &str {
        &self.number
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.number)
    }
}

impl From<&str> for Address {
    fn from(number: &str) -> Self {
        Self::new(number)
    }
}

impl From<String> for Address {
    fn from(number: String) -> Self {
        Self::new(number)
    }
}

/// A phone device the application controls or observes.
///
/// The `observed` flag mirrors the server's monitoring state. Only
/// [`StliConnection::observe_terminal`](crate::StliConnection::observe_terminal)
/// changes it, and only after the server acknowledged the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    attached_number: String,
    observed: bool,
    address: Address,
}

impl Terminal {
    /// Terminal for `address`, attached to the address number, not observed.
    pub fn new(address: Address) -> Self {
        Self {
            attached_number: address
                .number()
                .to_string(),
            observed: false,
            address,
        }
    }

    /// Number used to address the device in commands.
    pub fn attached_number(&self) -> &str {
        &self.attached_number
    }

    /// Whether the server is currently monitoring this terminal.
    pub fn is_observed(&self) -> bool {
        self.observed
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub(crate) fn set_observed(&mut self, observed: bool) {
        self.observed = observed;
    }
}

/// A call created by a successful `MakeCall` exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    originating: Address,
    destination: Address,
}

impl Call {
    pub fn new(originating: Address, destination: Address) -> Self {
        Self {
            originating,
            destination,
        }
    }

    /// Calling party.
    pub fn originating(&self) -> &Address {
        &self.originating
    }

    /// Called party.
    pub fn destination(&self) -> &Address {
        &self.destination
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.originating, self.destination)
    }
}
