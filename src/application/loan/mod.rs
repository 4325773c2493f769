mod lifecycle;
mod queries;

pub use lifecycle::{approve, cancel, reject, reserve, return_loan};
pub(crate) use lifecycle::load_loan;
pub use queries::{LoanDetails, get_loan, list_loans, loan_events};
