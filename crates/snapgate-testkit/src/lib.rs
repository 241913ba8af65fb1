//! Snapgate Testing Infrastructure
//!
//! One [`TestEnvironment`] wires every domain component to in-memory
//! handlers, a simulated clock and seeded randomness, so tests can move
//! time forward and get the same ids and passwords on every run.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,no_run
//! use snapgate_testkit::TestEnvironment;
//!
//! # async fn demo() {
//! let env = TestEnvironment::new();
//! let page = b"<h1>hi</h1>".as_slice();
//! let created = env.publish("user-1", &[("index.html", "text/html", page)]).await;
//! env.advance_days(1);
//! # let _ = created;
//! # }
//! ```

pub mod environment;
pub mod fixtures;

pub use environment::TestEnvironment;
pub use fixtures::{fast_hasher, html_of_len, test_config, TEST_SECRET};
