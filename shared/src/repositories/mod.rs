pub mod bot_user_repository;
pub mod vendor_repository;

pub use bot_user_repository::BotUserRepository;
pub use vendor_repository::VendorRepository;
