//! Headless browser management: launching, pooling and page navigation.

pub mod identity;
pub mod launcher;
pub mod navigator;
pub mod pool;

pub use identity::random_user_agent;
pub use launcher::{BrowserLauncher, BrowserSession, ChromeInstance, ChromeLauncher};
pub use navigator::{NavigationSettings, PageSnapshot};
pub use pool::{BrowserPool, PoolEntry, PoolLease, PoolStatus};
