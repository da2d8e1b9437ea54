pub mod cache;
pub mod db;
pub mod mailer;
pub mod media;
pub mod policy;

pub use cache::RedisCache;
pub use db::DbAdapter;
pub use mailer::SmtpMailer;
pub use media::S3MediaStorage;
pub use policy::PolicyTable;
