pub mod chat;
pub mod guard;
pub mod lifecycle;
pub mod payments;
pub mod realtime;
pub mod runtime;
pub mod session;
pub mod toast;
pub mod transport;

pub use runtime::ClientRuntime;
pub use session::{Session, SessionHandle};
pub use transport::{ApiTransport, HttpTransport, TransportError};
