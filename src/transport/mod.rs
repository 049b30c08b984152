pub mod ack;
pub mod loopback;
pub mod tcp;
pub mod traits;

pub use loopback::LoopbackTransport;
pub use tcp::TcpTransport;
pub use traits::{
    AckCallback, CorrelationToken, Disposition, MessageHandler, SendStatus, Transport,
};
