use chrono::{Duration, Months, NaiveDate};

use crate::models::{DateWindow, DayEntry, PredictionResult};
use crate::prediction::classify_day;

/// Day-by-day walk over an inclusive date range against one cycle's windows.
///
/// The windows are fixed for the whole walk: days past the first cycle do not
/// pick up a second predicted fertile window.
#[derive(Debug, Clone)]
pub struct CalendarDays {
    next: Option<NaiveDate>,
    end: NaiveDate,
    period_window: DateWindow,
    fertile_window: DateWindow,
    ovulation_date: NaiveDate,
}

impl CalendarDays {
    /// Panics if the period window ends past `NaiveDate::MAX`.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        cycle_start: NaiveDate,
        period_duration: u32,
        fertile_window: DateWindow,
        ovulation_date: NaiveDate,
    ) -> Self {
        let period_end = cycle_start + Duration::days(i64::from(period_duration) - 1);
        Self {
            next: (start <= end).then_some(start),
            end,
            period_window: DateWindow::new(cycle_start, period_end),
            fertile_window,
            ovulation_date,
        }
    }
}

impl Iterator for CalendarDays {
    type Item = DayEntry;

    fn next(&mut self) -> Option<DayEntry> {
        let date = self.next?;
        self.next = date.succ_opt().filter(|d| *d <= self.end);

        let flags = classify_day(
            date,
            &self.period_window,
            &self.fertile_window,
            self.ovulation_date,
        );
        Some(DayEntry {
            date,
            day_of_week: date.format("%A").to_string(),
            is_period_day: flags.is_period_day,
            is_fertile_day: flags.is_fertile_day,
            is_ovulation_day: flags.is_ovulation_day,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map_or(0, |d| (self.end - d).num_days().max(-1) + 1) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CalendarDays {}

/// One entry per day from `start` to `end` inclusive, ascending.
/// An inverted range yields nothing.
pub fn expand_calendar(
    start: NaiveDate,
    end: NaiveDate,
    cycle_start: NaiveDate,
    period_duration: u32,
    fertile_window: DateWindow,
    ovulation_date: NaiveDate,
) -> Vec<DayEntry> {
    CalendarDays::new(
        start,
        end,
        cycle_start,
        period_duration,
        fertile_window,
        ovulation_date,
    )
    .collect()
}

/// Expand using the windows stored in an already computed prediction.
pub fn expand_from_result(
    start: NaiveDate,
    end: NaiveDate,
    result: &PredictionResult,
) -> Vec<DayEntry> {
    let fertile = &result.predictions.fertile_window;
    expand_calendar(
        start,
        end,
        result.cycle_info.current_cycle_started,
        result.cycle_info.period_duration,
        DateWindow::new(fertile.start, fertile.end),
        result.predictions.ovulation.date,
    )
}

/// `[cycle_start, cycle_start + months]`, or `None` past the end of the calendar.
pub fn calendar_range(cycle_start: NaiveDate, months: u32) -> Option<(NaiveDate, NaiveDate)> {
    let end = cycle_start.checked_add_months(Months::new(months))?;
    Some((cycle_start, end))
}
