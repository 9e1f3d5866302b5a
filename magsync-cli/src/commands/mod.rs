pub mod check;
pub mod session;
pub mod tcp;
pub mod udp;

pub use session::SessionOptions;
