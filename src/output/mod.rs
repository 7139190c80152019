//! Report formatting and the audit trail

pub mod audit;
pub mod formatter;
