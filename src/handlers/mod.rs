pub mod expenses;
pub mod general;
pub mod payroll;
pub mod records;
pub mod reports;
