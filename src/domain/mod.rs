mod account;
mod history;
mod money;

pub use account::*;
pub use history::*;
pub use money::*;
