//! STLI computer-telephony-integration client for Rust
//!
//! STLI is a line-oriented text protocol: the client writes one command per
//! line and the server answers with `error_ind <STATUS> <command>` lines,
//! followed by notification lines for observed terminals. This crate provides
//! an async tokio client that negotiates the session, originates calls and
//! starts or stops terminal observation.
//!
//! # Architecture
//!
//! - [`LineTransport`]: the byte stream, with [`TcpLineTransport`] as the
//!   tokio TCP implementation
//! - [`StliConnection`]: the protocol engine; owns its transport and drives
//!   the negotiated session through `&mut self` operations
//! - [`CtiProvider`]: protocol-independent interface the engine implements
//!
//! # Example
//!
//! ```rust,no_run
//! use stli_tokio::{Address, StliConnection, StliError, TcpLineTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StliError> {
//!     let mut conn = StliConnection::new(TcpLineTransport::new("pbx.example.net", 4000));
//!     conn.connect().await?;
//!
//!     let mut terminal = conn.get_terminal(Address::new("201"));
//!     if !conn.observe_terminal(&mut terminal, true).await? {
//!         eprintln!("server refused to monitor 201");
//!     }
//!
//!     let call = conn.create_call(&terminal, &Address::new("5551234")).await?;
//!     println!("Calling: {}", call);
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire tracing
//!
//! Every line sent and received can be observed through [`ProtocolTrace`].
//! [`TracingTrace`] forwards them to `tracing` under the `stli::wire` target:
//!
//! ```rust
//! use stli_tokio::{StliConnectOptions, TracingTrace};
//!
//! let options = StliConnectOptions::default().with_trace(TracingTrace);
//! assert_eq!(options.version, 2);
//! ```

pub mod command;
pub mod connection;
pub mod constants;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod terminal;
pub mod trace;
pub mod transport;

pub use command::StliCommand;
pub use connection::{SessionState, StliConnectOptions, StliConnection};
pub use constants::STLI_VERSION_2;
pub use error::{StliError, StliResult};
pub use protocol::{CallInitiated, DeviceInformation, InitAck, InitDetail, Pattern};
pub use provider::CtiProvider;
pub use terminal::{Address, Call, Terminal};
pub use trace::{NoTrace, ProtocolTrace, TracingTrace};
pub use transport::{LineTransport, TcpLineTransport, TcpTransportOptions};
