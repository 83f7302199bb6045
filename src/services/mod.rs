pub mod dispatcher;
pub mod error;
pub mod transport;

pub use dispatcher::{ChatDispatcher, SendMessageRequest};
pub use error::{DispatchError, TransportError};
pub use transport::{ChatTransport, ReqwestTransport, ResponseBody, TransportResponse};
