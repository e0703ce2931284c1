pub mod api_server;
pub mod postgres;
pub mod redis_codes;
pub mod telegram;

pub use api_server::start_api_server;
pub use postgres::PostgresStore;
pub use redis_codes::RedisLinkCodeStore;
pub use telegram::{random_code, TelegramBotClient};
