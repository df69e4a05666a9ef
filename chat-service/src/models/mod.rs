pub mod message;
pub mod notification;
pub mod session;

pub use message::Message;
pub use notification::Notification;
pub use session::{session_key, DisplayProfile, MessagePreview, Session};
