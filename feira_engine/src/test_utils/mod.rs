//! Helpers shared by the integration tests: database bootstrap, row seeding and a scriptable
//! in-memory payment gateway.

pub mod mock_gateway;
pub mod prepare_env;
pub mod seed;
