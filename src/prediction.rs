use chrono::{Duration, NaiveDate};

use crate::models::{
    CycleInfo, CycleInput, DateWindow, DayFlags, DerivedDates, FertileWindowForecast,
    FertileWindowPhase, FertilityLevel, FertilityStatus, NextPeriodForecast, OvulationForecast,
    OvulationStatus, PredictionResult, Predictions, TodayStatus,
};

/// Days from ovulation to the next period, assumed constant.
pub const LUTEAL_PHASE_DAYS: i64 = 14;
/// The fertile window opens this many days before ovulation.
pub const FERTILE_WINDOW_LEAD_DAYS: i64 = 5;
/// The high-chance window opens this many days before ovulation.
pub const HIGH_CHANCE_LEAD_DAYS: i64 = 2;
/// Fixed next-period confidence. There is no cycle-regularity model behind it yet.
pub const NEXT_PERIOD_CONFIDENCE: f32 = 0.85;

/// Compute the key dates of the cycle starting at `last_period_date`.
///
/// Panics if a derived date falls outside `NaiveDate::MIN..=NaiveDate::MAX`.
pub fn derive_dates(
    cycle_length: u32,
    period_duration: u32,
    last_period_date: NaiveDate,
) -> DerivedDates {
    let cycle_length = i64::from(cycle_length);
    let ovulation_date = last_period_date + Duration::days(cycle_length - LUTEAL_PHASE_DAYS);
    let next_period_date = last_period_date + Duration::days(cycle_length);
    let period_end = last_period_date + Duration::days(i64::from(period_duration) - 1);

    DerivedDates {
        ovulation_date,
        next_period_date,
        period_window: DateWindow::new(last_period_date, period_end),
        fertile_window: DateWindow::new(
            ovulation_date - Duration::days(FERTILE_WINDOW_LEAD_DAYS),
            ovulation_date,
        ),
        high_chance_window: DateWindow::new(
            ovulation_date - Duration::days(HIGH_CHANCE_LEAD_DAYS),
            ovulation_date,
        ),
    }
}

/// Classify a single day against fixed cycle windows.
pub fn classify_day(
    date: NaiveDate,
    period_window: &DateWindow,
    fertile_window: &DateWindow,
    ovulation_date: NaiveDate,
) -> DayFlags {
    DayFlags {
        is_period_day: period_window.contains(date),
        is_fertile_day: fertile_window.contains(date),
        is_ovulation_day: date == ovulation_date,
    }
}

/// Predict period, ovulation and fertile window status as seen from `today`.
///
/// Total over its inputs: a `today` before `last_period_date` yields negative
/// cycle days and offsets rather than an error. Dates must stay within chrono's
/// representable range after adding `cycle_length` days; date arithmetic panics
/// within a few weeks of `NaiveDate::MIN`/`MAX`.
pub fn predict(
    cycle_length: u32,
    period_duration: u32,
    last_period_date: NaiveDate,
    today: NaiveDate,
) -> PredictionResult {
    let dates = derive_dates(cycle_length, period_duration, last_period_date);
    let cycle_day = (today - last_period_date).num_days() + 1;

    let flags = classify_day(
        today,
        &dates.period_window,
        &dates.fertile_window,
        dates.ovulation_date,
    );

    PredictionResult {
        today: TodayStatus {
            date: today,
            is_period_day: flags.is_period_day,
            is_fertile_day: flags.is_fertile_day,
            is_ovulation_day: flags.is_ovulation_day,
            is_safe_day: flags.is_safe_day(),
            cycle_day,
        },
        predictions: Predictions {
            next_period: NextPeriodForecast {
                date: dates.next_period_date,
                days_until: (dates.next_period_date - today).num_days(),
                confidence: NEXT_PERIOD_CONFIDENCE,
            },
            ovulation: ovulation_forecast(today, &dates),
            fertile_window: fertile_window_forecast(today, &dates),
        },
        cycle_info: CycleInfo {
            current_cycle_started: last_period_date,
            current_cycle_day: cycle_day,
            cycle_length,
            period_duration,
        },
    }
}

impl CycleInput {
    pub fn derived_dates(&self) -> DerivedDates {
        derive_dates(self.cycle_length, self.period_duration, self.last_period_date)
    }

    pub fn predict(&self, today: NaiveDate) -> PredictionResult {
        predict(
            self.cycle_length,
            self.period_duration,
            self.last_period_date,
            today,
        )
    }
}

fn ovulation_forecast(today: NaiveDate, dates: &DerivedDates) -> OvulationForecast {
    let ovulation = dates.ovulation_date;
    let high_chance = &dates.high_chance_window;

    let (status, fertility_status) = if today == ovulation {
        (OvulationStatus::Today, Some(FertilityStatus::PeakFertility))
    } else if today < ovulation {
        // The high-chance window ends on ovulation day, so one of these always applies.
        let fertility = if high_chance.contains(today) {
            Some(FertilityStatus::HighChanceActive)
        } else if today < high_chance.start {
            Some(FertilityStatus::HighChanceApproaching)
        } else {
            None
        };
        (OvulationStatus::Upcoming, fertility)
    } else {
        (OvulationStatus::Passed, None)
    };

    OvulationForecast {
        date: ovulation,
        days_until: (ovulation - today).num_days(),
        status,
        fertility_status,
    }
}

fn fertile_window_forecast(today: NaiveDate, dates: &DerivedDates) -> FertileWindowForecast {
    let window = &dates.fertile_window;

    let phase = if today < window.start {
        FertileWindowPhase::Upcoming {
            days_until_start: (window.start - today).num_days(),
        }
    } else if window.contains(today) {
        let fertility_level = if dates.high_chance_window.contains(today) {
            FertilityLevel::High
        } else {
            FertilityLevel::Medium
        };
        FertileWindowPhase::Active {
            days_remaining: (window.end - today).num_days(),
            fertility_level,
        }
    } else {
        FertileWindowPhase::Passed
    };

    FertileWindowForecast {
        start: window.start,
        end: window.end,
        phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn jan_cycle(today: &str) -> PredictionResult {
        predict(28, 5, date("2024-01-01"), date(today))
    }

    #[test]
    fn first_day_of_cycle() {
        let result = jan_cycle("2024-01-01");
        assert_eq!(result.predictions.ovulation.date, date("2024-01-15"));
        assert_eq!(result.predictions.next_period.date, date("2024-01-29"));
        assert_eq!(result.predictions.fertile_window.start, date("2024-01-10"));
        assert_eq!(result.predictions.fertile_window.end, date("2024-01-15"));
        assert!(result.today.is_period_day);
        assert!(!result.today.is_safe_day);
        assert_eq!(result.today.cycle_day, 1);
        assert_eq!(result.cycle_info.current_cycle_day, 1);
        assert_eq!(
            result.predictions.fertile_window.phase,
            FertileWindowPhase::Upcoming {
                days_until_start: 9
            }
        );
        assert_eq!(
            result.predictions.ovulation.fertility_status,
            Some(FertilityStatus::HighChanceApproaching)
        );
    }

    #[test]
    fn ovulation_day_is_peak() {
        let result = jan_cycle("2024-01-15");
        assert!(result.today.is_ovulation_day);
        assert!(result.today.is_fertile_day);
        assert_eq!(result.predictions.ovulation.status, OvulationStatus::Today);
        assert_eq!(
            result.predictions.ovulation.fertility_status,
            Some(FertilityStatus::PeakFertility)
        );
        assert_eq!(result.predictions.ovulation.days_until, 0);
    }

    #[test]
    fn high_chance_day_inside_fertile_window() {
        let result = jan_cycle("2024-01-13");
        assert!(result.today.is_fertile_day);
        assert!(!result.today.is_period_day);
        assert_eq!(
            result.predictions.fertile_window.phase,
            FertileWindowPhase::Active {
                days_remaining: 2,
                fertility_level: FertilityLevel::High,
            }
        );
        assert_eq!(
            result.predictions.ovulation.fertility_status,
            Some(FertilityStatus::HighChanceActive)
        );
    }

    #[test]
    fn day_before_high_chance_window_is_medium() {
        // Two days before ovulation is where the high-chance window opens.
        let result = jan_cycle("2024-01-12");
        assert!(result.today.is_fertile_day);
        assert_eq!(
            result.predictions.fertile_window.phase,
            FertileWindowPhase::Active {
                days_remaining: 3,
                fertility_level: FertilityLevel::Medium,
            }
        );
    }

    #[test]
    fn early_fertile_day_is_medium() {
        let result = jan_cycle("2024-01-10");
        assert_eq!(
            result.predictions.fertile_window.phase,
            FertileWindowPhase::Active {
                days_remaining: 5,
                fertility_level: FertilityLevel::Medium,
            }
        );
        assert_eq!(
            result.predictions.ovulation.fertility_status,
            Some(FertilityStatus::HighChanceApproaching)
        );
    }

    #[test]
    fn after_ovulation_everything_passed() {
        let result = jan_cycle("2024-01-20");
        assert_eq!(result.predictions.ovulation.status, OvulationStatus::Passed);
        assert_eq!(result.predictions.ovulation.fertility_status, None);
        assert_eq!(
            result.predictions.fertile_window.phase,
            FertileWindowPhase::Passed
        );
        assert_eq!(result.predictions.next_period.days_until, 9);
        assert!(result.today.is_safe_day);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["predictions"]["ovulation"]
            .get("fertility_status")
            .is_none());
        assert_eq!(json["predictions"]["fertile_window"]["status"], "passed");
    }

    #[test]
    fn late_logging_is_not_clamped() {
        let result = jan_cycle("2024-02-05");
        assert_eq!(result.today.cycle_day, 36);
        assert_eq!(result.predictions.next_period.days_until, -7);
    }

    #[test]
    fn today_before_cycle_start_is_well_defined() {
        let result = jan_cycle("2023-12-25");
        assert_eq!(result.today.cycle_day, -6);
        assert!(result.today.is_safe_day);
        assert_eq!(result.predictions.ovulation.status, OvulationStatus::Upcoming);
        assert_eq!(result.predictions.next_period.days_until, 35);
    }

    #[test]
    fn dates_near_calendar_edges() {
        let late = NaiveDate::MAX - Duration::days(45);
        let result = predict(45, 10, late, late);
        assert_eq!(result.predictions.next_period.date, NaiveDate::MAX);

        let early = NaiveDate::MIN;
        let result = predict(21, 2, early, early);
        assert_eq!(
            result.predictions.fertile_window.start,
            early + Duration::days(2)
        );
    }

    #[test]
    fn overlapping_period_and_fertile_window() {
        // 21-day cycle with a 10-day period: ovulation on day 8, fertile from day 3.
        let result = predict(21, 10, date("2024-03-01"), date("2024-03-05"));
        assert!(result.today.is_period_day);
        assert!(result.today.is_fertile_day);
        assert!(!result.today.is_safe_day);
    }

    #[test]
    fn serialized_shape() {
        let json = serde_json::to_value(jan_cycle("2024-01-13")).unwrap();
        assert_eq!(json["today"]["date"], "2024-01-13");
        assert_eq!(json["predictions"]["ovulation"]["status"], "upcoming");
        assert_eq!(
            json["predictions"]["ovulation"]["fertility_status"],
            "high_chance_active"
        );
        assert_eq!(json["predictions"]["fertile_window"]["status"], "active");
        assert_eq!(json["predictions"]["fertile_window"]["fertility_level"], "high");
        assert_eq!(json["predictions"]["fertile_window"]["days_remaining"], 2);
        assert_eq!(json["cycle_info"]["current_cycle_started"], "2024-01-01");
    }

    #[test]
    fn result_survives_json() {
        let result = jan_cycle("2024-01-07");
        let json = serde_json::to_string(&result).unwrap();
        let back: PredictionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    proptest! {
        #[test]
        fn derived_dates_follow_formulas(
            cycle_length in 21u32..=45,
            period_duration in 2u32..=10,
            offset in 0i64..730,
            elapsed in -30i64..90,
        ) {
            let last = date("2023-01-01") + Duration::days(offset);
            let today = last + Duration::days(elapsed);
            let result = predict(cycle_length, period_duration, last, today);
            let ovulation = last + Duration::days(i64::from(cycle_length) - 14);

            prop_assert_eq!(result.predictions.ovulation.date, ovulation);
            prop_assert_eq!(
                result.predictions.next_period.date,
                last + Duration::days(i64::from(cycle_length))
            );
            prop_assert_eq!(result.predictions.fertile_window.start, ovulation - Duration::days(5));
            prop_assert_eq!(result.predictions.fertile_window.end, ovulation);
            prop_assert!(ovulation < result.predictions.next_period.date);
            prop_assert_eq!(result.today.cycle_day, elapsed + 1);

            let dates = derive_dates(cycle_length, period_duration, last);
            prop_assert_eq!(dates.high_chance_window.start, ovulation - Duration::days(2));
            prop_assert!(dates.fertile_window.start <= dates.high_chance_window.start);
            prop_assert_eq!(dates.high_chance_window.end, dates.fertile_window.end);
        }

        #[test]
        fn safe_day_excludes_period_and_fertile(
            cycle_length in 21u32..=45,
            period_duration in 2u32..=10,
            elapsed in 0i64..60,
        ) {
            let last = date("2024-05-01");
            let today = last + Duration::days(elapsed);
            let status = predict(cycle_length, period_duration, last, today).today;
            prop_assert_eq!(status.is_safe_day, !status.is_period_day && !status.is_fertile_day);
        }

        #[test]
        fn prediction_is_deterministic(
            cycle_length in 21u32..=45,
            period_duration in 2u32..=10,
            elapsed in -10i64..60,
        ) {
            let last = date("2024-02-20");
            let today = last + Duration::days(elapsed);
            prop_assert_eq!(
                predict(cycle_length, period_duration, last, today),
                predict(cycle_length, period_duration, last, today)
            );
        }
    }
}
