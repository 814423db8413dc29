mod account;
mod feedback;
mod ledger;
mod money;
mod order;

pub use account::*;
pub use feedback::*;
pub use ledger::*;
pub use money::*;
pub use order::*;
