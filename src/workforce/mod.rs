//! Workforce scheduling entities and their remote document store.

pub mod cache;
pub mod client;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod testdata;

pub use client::WorkforceClient;
pub use service::{ScopeStatus, WorkforceService, SHIFT_RETENTION_DAYS};
pub use types::{
  Absence, AbsenceKind, AbsenceStatus, CompanyScope, Contract, ContractKind, Employee,
  EmployeeScope, Shift, WeekScope,
};
