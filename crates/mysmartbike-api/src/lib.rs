// mysmartbike-api: Async Rust client for the MySmartBike cloud API

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod models;
pub mod transport;

pub use client::SessionClient;
pub use config::{ApiConfig, Credentials, ProtocolHeaders};
pub use error::Error;
pub use executor::{RequestBody, RequestExecutor, RequestOptions};
pub use mapper::map_devices;
pub use models::DeviceRecord;
pub use transport::{HttpSessionProvider, SessionManager, SessionPolicy, SessionProvider};
