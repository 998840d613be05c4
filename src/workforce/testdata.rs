//! Fixture builders shared by unit tests. Every fixture belongs to company `acme`.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use super::types::{
  Absence, AbsenceKind, AbsenceStatus, Contract, ContractKind, Employee, Shift,
};

fn stamp(version: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(version.into())
}

pub fn employee(id: &str, first_name: &str) -> Employee {
  Employee {
    id: id.to_string(),
    company_id: "acme".to_string(),
    first_name: first_name.to_string(),
    last_name: "Smith".to_string(),
    email: Some(format!("{}@acme.test", id)),
    phone: None,
    role: "staff".to_string(),
    hourly_rate_cents: Some(1850),
    active: true,
    updated_at: stamp(0),
    avatar_url: None,
  }
}

/// Employee `id` at revision `version`.
pub fn employee_v(id: &str, version: u32) -> Employee {
  Employee {
    role: format!("staff v{}", version),
    updated_at: stamp(version),
    ..employee(id, id)
  }
}

pub fn shift(id: &str, employee_id: &str, date: NaiveDate) -> Shift {
  Shift {
    id: id.to_string(),
    company_id: "acme".to_string(),
    employee_id: employee_id.to_string(),
    date,
    start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    break_minutes: 30,
    position: Some("front desk".to_string()),
    notes: None,
    updated_at: stamp(0),
  }
}

pub fn contract(id: &str, employee_id: &str) -> Contract {
  Contract {
    id: id.to_string(),
    company_id: "acme".to_string(),
    employee_id: employee_id.to_string(),
    kind: ContractKind::PartTime,
    start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    end_date: None,
    weekly_minutes: 20 * 60,
    updated_at: stamp(0),
  }
}

pub fn absence(id: &str, employee_id: &str) -> Absence {
  Absence {
    id: id.to_string(),
    company_id: "acme".to_string(),
    employee_id: employee_id.to_string(),
    kind: AbsenceKind::Vacation,
    status: AbsenceStatus::Pending,
    start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
    end_date: NaiveDate::from_ymd_opt(2026, 11, 6).unwrap(),
    note: None,
    updated_at: stamp(0),
  }
}
