pub mod book;
pub mod commands;
pub mod errors;
pub mod events;
pub mod inventory;
pub mod loan;
pub mod review;
pub mod value_objects;

pub use errors::*;
pub use events::*;
pub use inventory::{CopyCounter, Release};
pub use loan::{LoanPeriod, LoanStatus, LoanType};
pub use value_objects::*;
