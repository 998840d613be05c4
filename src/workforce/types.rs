use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Employee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
  pub id: String,
  pub company_id: String,
  pub first_name: String,
  pub last_name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub role: String,
  pub hourly_rate_cents: Option<i64>,
  pub active: bool,
  pub updated_at: DateTime<Utc>,
  /// Presentation only
  #[serde(default)]
  pub avatar_url: Option<String>,
}

/// A scheduled shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
  pub id: String,
  pub company_id: String,
  pub employee_id: String,
  pub date: NaiveDate,
  pub start: NaiveTime,
  pub end: NaiveTime,
  #[serde(default)]
  pub break_minutes: u32,
  pub position: Option<String>,
  pub notes: Option<String>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
  FullTime,
  PartTime,
  Temporary,
  Freelance,
}

impl ContractKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ContractKind::FullTime => "full_time",
      ContractKind::PartTime => "part_time",
      ContractKind::Temporary => "temporary",
      ContractKind::Freelance => "freelance",
    }
  }
}

/// Employment contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
  pub id: String,
  pub company_id: String,
  pub employee_id: String,
  pub kind: ContractKind,
  pub start_date: NaiveDate,
  pub end_date: Option<NaiveDate>,
  pub weekly_minutes: u32,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceKind {
  Vacation,
  Sick,
  Personal,
  Other,
}

impl AbsenceKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      AbsenceKind::Vacation => "vacation",
      AbsenceKind::Sick => "sick",
      AbsenceKind::Personal => "personal",
      AbsenceKind::Other => "other",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceStatus {
  Pending,
  Approved,
  Rejected,
}

impl AbsenceStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      AbsenceStatus::Pending => "pending",
      AbsenceStatus::Approved => "approved",
      AbsenceStatus::Rejected => "rejected",
    }
  }
}

/// Absence request (vacation, sick leave, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Absence {
  pub id: String,
  pub company_id: String,
  pub employee_id: String,
  pub kind: AbsenceKind,
  pub status: AbsenceStatus,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub note: Option<String>,
  pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Scopes
// ============================================================================

/// Everything a company owns of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyScope {
  pub company_id: String,
}

impl CompanyScope {
  pub fn new(company_id: impl Into<String>) -> Self {
    Self {
      company_id: company_id.into(),
    }
  }
}

/// One company week, Monday through Sunday
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekScope {
  pub company_id: String,
  pub week_start: NaiveDate,
}

impl WeekScope {
  pub fn new(company_id: impl Into<String>, week_start: NaiveDate) -> Self {
    Self {
      company_id: company_id.into(),
      week_start,
    }
  }

  /// The week containing `date`.
  pub fn containing(company_id: impl Into<String>, date: NaiveDate) -> Self {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let week_start = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
    Self::new(company_id, week_start)
  }

  pub fn week_end(&self) -> NaiveDate {
    self
      .week_start
      .checked_add_days(Days::new(6))
      .unwrap_or(self.week_start)
  }
}

/// Records of a single employee within a company
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeScope {
  pub company_id: String,
  pub employee_id: String,
}

impl EmployeeScope {
  pub fn new(company_id: impl Into<String>, employee_id: impl Into<String>) -> Self {
    Self {
      company_id: company_id.into(),
      employee_id: employee_id.into(),
    }
  }
}
