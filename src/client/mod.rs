//! Interactive terminal client for the document service.

mod api;
mod repl;
mod session;

pub use api::{ApiClient, ClientError};
pub use repl::{Command, Repl};
pub use session::{Exchange, Session};
