pub mod auth;
pub mod book;
pub mod notifier;
pub mod otp;
pub mod resource;
pub mod user;

pub use auth::AuthService;
pub use book::BookService;
pub use notifier::{OtpNotifier, TracingNotifier};
pub use otp::OtpService;
pub use resource::ResourceService;
pub use user::UserService;
