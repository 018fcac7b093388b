//! Testing utilities for Keystone dispatchers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use keystone_core::{Arguments, Dispatcher, Error, Operation, RequestContext, Resource};
//! use keystone_testing::*;
//!
//! struct Hello;
//!
//! impl Resource for Hello {
//!     fn operations() -> Vec<Operation<Self>> {
//!         vec![Operation::get("/hello").handler(|_: &Hello, _: Arguments| Ok::<_, Error>("Hello!"))]
//!     }
//!
//!     fn create(_ctx: &RequestContext) -> Result<Self, Error> {
//!         Ok(Hello)
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let client = TestClient::new(Dispatcher::<Hello>::builder().build().unwrap());
//!
//! let response = client.get("/hello").await;
//! assert_status(&response, 200);
//! assert_eq!(response.body_string(), Some("Hello!".to_string()));
//! # });
//! ```
//!
//! ## Role checks
//!
//! ```
//! use keystone_core::{Principal, RoleHandler};
//! use keystone_testing::MockRoleHandler;
//!
//! let roles = MockRoleHandler::new().grant("ann", "admin");
//! assert!(roles.has_role(&Principal::new("ann"), "admin"));
//! assert_eq!(roles.call_count(), 1);
//! ```

pub mod assertions;
pub mod mock;
pub mod test_client;

pub use assertions::*;
pub use mock::*;
pub use test_client::*;
