// Application layer - use cases and orchestration.
// The wallet service owns every balance mutation; orders, accounts and
// feedback build on top of it and on the repository.

pub mod accounts;
pub mod error;
pub mod feedback;
pub mod orders;
pub mod service;
pub mod validation;
pub mod wallet;

pub use accounts::*;
pub use error::*;
pub use feedback::*;
pub use orders::*;
pub use service::*;
pub use validation::*;
pub use wallet::*;
