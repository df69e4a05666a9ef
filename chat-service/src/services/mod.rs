pub mod message_service;
pub mod notification_service;
pub mod profile_directory;
pub mod session_service;

pub use message_service::{MessageService, SendMessageInput};
pub use notification_service::{NotificationEmitter, NotificationSink, RecordingSink, TracingSink};
pub use profile_directory::{placeholder_profile, ProfileDirectory, StaticProfileDirectory};
pub use session_service::SessionService;
