use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::calendar;
use crate::models::{DayEntry, History, PeriodRecord, PredictionResult};
use crate::storage::{StorageError, Vault};
use crate::validation::{self, CalculationRequest, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("record {0} not found")]
    NotFound(u64),
    #[error("history is locked")]
    Locked,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("calendar range starting {0} is out of bounds")]
    InvalidRange(NaiveDate),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("state lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculationResponse {
    pub data: PredictionResult,
    pub record_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarResponse {
    pub calendar: Vec<DayEntry>,
    pub summary: PredictionResult,
}

/// Session settings the commands need from the configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub history_limit: usize,
    pub calendar_months: u32,
    pub user_id: Option<Uuid>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_limit: 10,
            calendar_months: 3,
            user_id: None,
        }
    }
}

/// Session state: the vault plus, while unlocked, its passphrase and history.
pub struct AppState {
    vault: Vault,
    settings: Settings,
    passphrase: Mutex<Option<String>>,
    history: Mutex<Option<History>>,
}

impl AppState {
    pub fn new(vault: Vault, settings: Settings) -> Self {
        Self {
            vault,
            settings,
            passphrase: Mutex::new(None),
            history: Mutex::new(None),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.history.lock().map(|h| h.is_some()).unwrap_or(false)
    }

    /// Zeroize the passphrase and drop history from memory.
    pub fn lock(&self) {
        if let Ok(mut pass) = self.passphrase.lock() {
            if let Some(ref mut p) = *pass {
                p.zeroize();
            }
            *pass = None;
        }
        if let Ok(mut history) = self.history.lock() {
            *history = None;
        }
    }

    fn history(&self) -> Result<MutexGuard<'_, Option<History>>, CommandError> {
        self.history.lock().map_err(|_| CommandError::Poisoned)
    }

    fn persist(&self, history: &History) -> Result<(), CommandError> {
        let pass = self.passphrase.lock().map_err(|_| CommandError::Poisoned)?;
        let pass = pass.as_deref().ok_or(CommandError::Locked)?;
        self.vault.save(pass, history)?;
        Ok(())
    }
}

pub fn is_setup(state: &AppState) -> bool {
    state.vault.exists()
}

/// Create an empty vault under `passphrase` and unlock it.
pub fn setup(passphrase: String, state: &AppState) -> Result<(), CommandError> {
    let history = History::default();
    state.vault.save(&passphrase, &history)?;

    *state.passphrase.lock().map_err(|_| CommandError::Poisoned)? = Some(passphrase);
    *state.history()? = Some(history);
    info!(path = %state.vault.path().display(), "vault created");
    Ok(())
}

/// Returns `false` for a wrong passphrase.
pub fn unlock(passphrase: String, state: &AppState) -> Result<bool, CommandError> {
    match state.vault.load(&passphrase) {
        Ok(history) => {
            *state.passphrase.lock().map_err(|_| CommandError::Poisoned)? = Some(passphrase);
            *state.history()? = Some(history);
            Ok(true)
        }
        Err(e) if e.is_wrong_passphrase() => {
            warn!("unlock rejected");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn lock(state: &AppState) {
    state.lock();
}

/// Validate, predict and, when `save` is set, append the result to history.
pub fn calculate(
    request: &CalculationRequest,
    today: NaiveDate,
    save: bool,
    state: &AppState,
) -> Result<CalculationResponse, CommandError> {
    let input = validation::validate(request, today)?;
    let data = input.predict(today);

    let record_id = if save {
        let mut guard = state.history()?;
        let history = guard.as_mut().ok_or(CommandError::Locked)?;
        let mut updated = history.clone();
        let id = updated.append(PeriodRecord {
            id: 0,
            user_id: state.settings.user_id,
            cycle_length: input.cycle_length,
            period_duration: input.period_duration,
            last_period_date: input.last_period_date,
            age: input.age,
            calculated_ovulation_date: data.predictions.ovulation.date,
            calculated_next_period_date: data.predictions.next_period.date,
            calculation_data: data.clone(),
            created_at: Utc::now(),
        });
        state.persist(&updated)?;
        *history = updated;
        info!(record_id = id, "calculation saved");
        Some(id)
    } else {
        None
    };

    Ok(CalculationResponse { data, record_id })
}

/// Day-by-day view from the last period date over the configured number of months.
pub fn calendar(
    request: &CalculationRequest,
    today: NaiveDate,
    state: &AppState,
) -> Result<CalendarResponse, CommandError> {
    let input = validation::validate(request, today)?;
    let summary = input.predict(today);

    let months = state.settings.calendar_months;
    let (start, end) = calendar::calendar_range(input.last_period_date, months)
        .ok_or(CommandError::InvalidRange(input.last_period_date))?;
    let calendar = calendar::expand_from_result(start, end, &summary);

    Ok(CalendarResponse { calendar, summary })
}

/// Most recent records first, capped at the configured limit.
pub fn history(state: &AppState) -> Result<Vec<PeriodRecord>, CommandError> {
    let guard = state.history()?;
    let history = guard.as_ref().ok_or(CommandError::Locked)?;
    Ok(history.recent(state.settings.history_limit))
}

pub fn show(id: u64, state: &AppState) -> Result<PeriodRecord, CommandError> {
    let guard = state.history()?;
    let history = guard.as_ref().ok_or(CommandError::Locked)?;
    history.find(id).cloned().ok_or(CommandError::NotFound(id))
}

pub fn destroy(id: u64, state: &AppState) -> Result<(), CommandError> {
    let mut guard = state.history()?;
    let history = guard.as_mut().ok_or(CommandError::Locked)?;
    let mut updated = history.clone();
    if !updated.remove(id) {
        return Err(CommandError::NotFound(id));
    }
    state.persist(&updated)?;
    *history = updated;
    info!(record_id = id, "record deleted");
    Ok(())
}

pub fn export_data(state: &AppState) -> Result<String, CommandError> {
    let guard = state.history()?;
    let history = guard.as_ref().ok_or(CommandError::Locked)?;
    Ok(serde_json::to_string_pretty(history)?)
}

pub fn wipe_all_data(state: &AppState) -> Result<(), CommandError> {
    state.lock();
    state.vault.wipe()?;
    Ok(())
}
