pub mod chat_log;
pub mod device;
pub mod oauth_state;
pub mod user;

pub use chat_log::{ChatLogRepositoryTrait, PgChatLogRepository};
pub use device::{DeviceRepositoryTrait, PgDeviceRepository, VersionedDocument};
pub use oauth_state::{OauthStateRepositoryTrait, PgOauthStateRepository};
pub use user::{PgUserRepository, UserRepositoryTrait};
