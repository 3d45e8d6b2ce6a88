mod account;
mod budget;
mod dates;
mod ledger;
mod money;
mod payee;
mod scheduled;
mod transaction;

pub use account::*;
pub use budget::*;
pub use dates::*;
pub use ledger::*;
pub use money::*;
pub use payee::*;
pub use scheduled::*;
pub use transaction::*;
