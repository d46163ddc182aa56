pub mod config;
pub mod logging;

pub mod fetcher;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod url_model;

pub use fetcher::Fetcher;
pub use retry::FetchError;
pub use scheduler::FetchResult;
