pub mod request;
pub mod response;

pub use request::ClientFrame;
pub use response::ChatEvent;
