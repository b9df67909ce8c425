pub mod form;
pub mod report;

pub use form::{FormErrors, PurchaseForm};
pub use report::ReportTable;
