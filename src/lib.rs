//! Bounded parallel task runner for cloud test orchestration
//!
//! The [`executor`] module is the reusable core: it fans a batch of inputs
//! out over a bounded worker pool, enforces a shared fail-fast timeout
//! budget, and reports one outcome per input in input order.
//!
//! ```no_run
//! use fanout::executor::{ParallelExecutor, RunConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), fanout::executor::RunError> {
//! let regions = ["us-east-1", "us-west-2", "eu-west-1"];
//! let config = RunConfig::new(regions, Duration::from_secs(100)).with_label("list-instances");
//!
//! let counts = ParallelExecutor::new(config)
//!     .run(|args| async move {
//!         let region: String = args.parse()?;
//!         Ok::<_, anyhow::Error>(region.len())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod executor;
pub mod ops;
pub mod output;
pub mod utils;
