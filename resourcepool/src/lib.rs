//! A bounded pool of reusable client resources, such as connections, to a
//! single backend.
//!
//! ```no_run
//! use resourcepool::{FnManager, Pool, PoolConfig, Target};
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = FnManager::new(
//!     |host: &str, port: u16| std::net::TcpStream::connect((host, port)),
//!     |stream: std::net::TcpStream| stream.shutdown(std::net::Shutdown::Both),
//! );
//! let pool = Pool::new(Target::new("localhost", 9090), manager, PoolConfig::new(3))?;
//!
//! let conn = pool.get().await?;
//! pool.release(conn).await?;
//! pool.destroy().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod guard;
mod lease;
pub mod manager;
mod pool;
mod state;

pub use config::{GetTimeout, PoolConfig, Target, DEFAULT_GET_TIMEOUT_SECS, DEFAULT_POOL_SIZE};
pub use error::{CloseErrors, ConfigError, PoolError, ReleaseError};
pub use lease::Lease;
pub use manager::{FnManager, Manager};
pub use pool::{Pool, PoolBuilder, Status};
pub use state::ResourceId;
