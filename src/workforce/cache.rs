//! Sync implementations for workforce types.

use chrono::NaiveDate;

use crate::cache::{Canonical, Scope, Syncable};

use super::types::{Absence, CompanyScope, Contract, Employee, EmployeeScope, Shift, WeekScope};

// ============================================================================
// Scope keys
// ============================================================================

impl Scope for CompanyScope {
  fn key(&self) -> String {
    self.company_id.clone()
  }
}

impl Scope for WeekScope {
  fn key(&self) -> String {
    format!("{}_{}", self.company_id, self.week_start)
  }

  fn window_end(&self) -> Option<NaiveDate> {
    Some(self.week_end())
  }
}

impl Scope for EmployeeScope {
  fn key(&self) -> String {
    format!("{}_{}", self.company_id, self.employee_id)
  }
}

// ============================================================================
// Syncable implementations
// ============================================================================

impl Syncable for Employee {
  type Scope = CompanyScope;

  fn id(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "employees"
  }

  // avatar_url is presentation only and left out
  fn canonical(&self) -> String {
    Canonical::new()
      .field(&self.id)
      .field(&self.company_id)
      .field(&self.first_name)
      .field(&self.last_name)
      .opt(self.email.as_deref())
      .opt(self.phone.as_deref())
      .field(&self.role)
      .opt(self.hourly_rate_cents)
      .field(self.active)
      .field(self.updated_at.timestamp_millis())
      .finish()
  }

  fn scope(&self) -> CompanyScope {
    CompanyScope::new(&self.company_id)
  }
}

impl Syncable for Shift {
  type Scope = WeekScope;

  fn id(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "shifts"
  }

  fn canonical(&self) -> String {
    Canonical::new()
      .field(&self.id)
      .field(&self.company_id)
      .field(&self.employee_id)
      .field(self.date)
      .field(self.start.format("%H:%M:%S"))
      .field(self.end.format("%H:%M:%S"))
      .field(self.break_minutes)
      .opt(self.position.as_deref())
      .opt(self.notes.as_deref())
      .field(self.updated_at.timestamp_millis())
      .finish()
  }

  fn scope(&self) -> WeekScope {
    WeekScope::containing(&self.company_id, self.date)
  }
}

impl Syncable for Contract {
  type Scope = EmployeeScope;

  fn id(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "contracts"
  }

  fn canonical(&self) -> String {
    Canonical::new()
      .field(&self.id)
      .field(&self.company_id)
      .field(&self.employee_id)
      .field(self.kind.as_str())
      .field(self.start_date)
      .opt(self.end_date)
      .field(self.weekly_minutes)
      .field(self.updated_at.timestamp_millis())
      .finish()
  }

  fn scope(&self) -> EmployeeScope {
    EmployeeScope::new(&self.company_id, &self.employee_id)
  }
}

impl Syncable for Absence {
  type Scope = CompanyScope;

  fn id(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "absences"
  }

  fn canonical(&self) -> String {
    Canonical::new()
      .field(&self.id)
      .field(&self.company_id)
      .field(&self.employee_id)
      .field(self.kind.as_str())
      .field(self.status.as_str())
      .field(self.start_date)
      .field(self.end_date)
      .opt(self.note.as_deref())
      .field(self.updated_at.timestamp_millis())
      .finish()
  }

  fn scope(&self) -> CompanyScope {
    CompanyScope::new(&self.company_id)
  }
}
