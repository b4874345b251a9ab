//! Common test utilities shared by the integration suites.
//!
//! - Fixtures (configurations, sinks, worker scripts)
//! - Assertion helpers over captured events
//! - Scripted health checks and prompts
//! - A minimal HTTP stub for the snippet service and health endpoint

pub mod assertions;
pub mod fixtures;
pub mod http_stub;
pub mod mock_health;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use http_stub::*;
#[allow(unused_imports)]
pub use mock_health::*;
