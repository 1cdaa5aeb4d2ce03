//! Core traits defined in `insights-core` and implemented by other crates.

pub mod navigation;
pub mod notifier;
pub mod store;

pub use navigation::Navigator;
pub use notifier::{Notice, NoticeLevel, Notifier};
pub use store::{KeyValueStore, StoreChange};
