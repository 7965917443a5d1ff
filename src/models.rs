use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validated inputs for one prediction. `age` is carried for the record only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleInput {
    pub cycle_length: u32,
    pub period_duration: u32,
    pub last_period_date: NaiveDate,
    pub age: u32,
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedDates {
    pub ovulation_date: NaiveDate,
    pub next_period_date: NaiveDate,
    pub period_window: DateWindow,
    pub fertile_window: DateWindow,
    pub high_chance_window: DateWindow,
}

/// Classification flags shared by the predictor and the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayFlags {
    pub is_period_day: bool,
    pub is_fertile_day: bool,
    pub is_ovulation_day: bool,
}

impl DayFlags {
    pub fn is_safe_day(&self) -> bool {
        !self.is_period_day && !self.is_fertile_day
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodayStatus {
    pub date: NaiveDate,
    pub is_period_day: bool,
    pub is_fertile_day: bool,
    pub is_ovulation_day: bool,
    pub is_safe_day: bool,
    pub cycle_day: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextPeriodForecast {
    pub date: NaiveDate,
    /// Negative once the predicted date has passed.
    pub days_until: i64,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OvulationStatus {
    Today,
    Upcoming,
    Passed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FertilityStatus {
    PeakFertility,
    HighChanceActive,
    HighChanceApproaching,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OvulationForecast {
    pub date: NaiveDate,
    pub days_until: i64,
    pub status: OvulationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fertility_status: Option<FertilityStatus>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FertilityLevel {
    High,
    Medium,
}

/// Where the reference date sits relative to the fertile window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FertileWindowPhase {
    Upcoming {
        days_until_start: i64,
    },
    Active {
        days_remaining: i64,
        fertility_level: FertilityLevel,
    },
    Passed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FertileWindowForecast {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub phase: FertileWindowPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Predictions {
    pub next_period: NextPeriodForecast,
    pub ovulation: OvulationForecast,
    pub fertile_window: FertileWindowForecast,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleInfo {
    pub current_cycle_started: NaiveDate,
    pub current_cycle_day: i64,
    pub cycle_length: u32,
    pub period_duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub today: TodayStatus,
    pub predictions: Predictions,
    pub cycle_info: CycleInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub is_period_day: bool,
    pub is_fertile_day: bool,
    pub is_ovulation_day: bool,
}

/// Immutable snapshot of one calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodRecord {
    pub id: u64,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub cycle_length: u32,
    pub period_duration: u32,
    pub last_period_date: NaiveDate,
    pub age: u32,
    pub calculated_ovulation_date: NaiveDate,
    pub calculated_next_period_date: NaiveDate,
    pub calculation_data: PredictionResult,
    pub created_at: DateTime<Utc>,
}

/// Everything kept in the encrypted vault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct History {
    pub next_id: u64,
    pub records: Vec<PeriodRecord>,
}

impl Default for History {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

impl History {
    /// Append a record, assigning the next id. Ids are never reused.
    pub fn append(&mut self, mut record: PeriodRecord) -> u64 {
        let id = self.next_id;
        record.id = id;
        self.records.push(record);
        self.next_id += 1;
        id
    }

    /// Newest first, at most `limit` records.
    pub fn recent(&self, limit: usize) -> Vec<PeriodRecord> {
        let mut records: Vec<&PeriodRecord> = self.records.iter().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.into_iter().take(limit).cloned().collect()
    }

    pub fn find(&self, id: u64) -> Option<&PeriodRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Returns `false` when no record has this id.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }
}
