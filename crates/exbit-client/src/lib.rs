//! Exchange client capability and Exbitron REST transport.
//!
//! The engine talks to the exchange only through [`ExchangeClient`]:
//! - [`RestClient`]: reqwest-backed implementation for the Exbitron v1 API
//! - [`MockExchangeClient`]: scriptable in-memory implementation for tests
//!
//! Credentials are carried by an explicit [`ClientSession`] handed to the
//! client constructor; nothing is stored in process-wide state.

pub mod error;
pub mod exchange;
pub mod mock;
pub mod rest;
pub mod session;
pub mod wire;

pub use error::{ClientError, ClientResult};
pub use exchange::{BoxFuture, DynExchangeClient, ExchangeClient};
pub use mock::{MockCall, MockExchangeClient};
pub use rest::RestClient;
pub use session::ClientSession;
