pub mod antibot;
pub mod browser_manager;
pub mod readiness;
pub mod source;

pub use readiness::{BrowserTab, ReadyOptions, Readiness};
pub use source::{ChromiumPageSource, PageSource};
