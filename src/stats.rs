use crate::models::{
    AppData, Entry, HabitSummary, MonthHabitStats, MonthStatsResponse, SummaryResponse,
    TodayHabit, TodayResponse, WeekHabit, WeekResponse,
};
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Inclusive span of calendar days. `end < start` is an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self::new(start, next.pred_opt()?))
    }

    pub fn iso_week(year: i32, week: u32) -> Option<Self> {
        let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
        Some(Self::new(start, start.checked_add_days(Days::new(6))?))
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn len_days(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() + 1
        }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.start.iter_days().take(self.len_days() as usize)
    }

    /// The range of equal length that ends the day before this one starts,
    /// or `None` when it would fall before the first representable date.
    pub fn preceding(&self) -> Option<Self> {
        let len = u64::try_from(self.len_days()).ok()?;
        Some(Self::new(
            self.start.checked_sub_days(Days::new(len))?,
            self.start.pred_opt()?,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HabitStats {
    pub rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub trend: f64,
}

fn completion_map(entries: &[Entry]) -> BTreeMap<NaiveDate, bool> {
    entries
        .iter()
        .map(|entry| (entry.date, entry.completed))
        .collect()
}

fn rate_of(days: &BTreeMap<NaiveDate, bool>, range: &DateRange) -> f64 {
    let total = range.len_days();
    if total == 0 {
        return 0.0;
    }
    let completed = range
        .days()
        .filter(|day| days.get(day).copied().unwrap_or(false))
        .count();
    completed as f64 * 100.0 / total as f64
}

/// Percentage of days in `range` marked completed. Days without an entry
/// count as not completed.
pub fn completion_rate(entries: &[Entry], range: &DateRange) -> f64 {
    rate_of(&completion_map(entries), range)
}

/// Consecutive completed days counted backward from `range.end`.
///
/// The walk follows the entries it is given, so a streak that began before
/// `range.start` is counted in full when those entries are supplied.
pub fn current_streak(entries: &[Entry], range: &DateRange) -> u32 {
    if range.is_empty() {
        return 0;
    }
    let days = completion_map(entries);
    let mut streak = 0;
    let mut day = range.end;
    while days.get(&day).copied().unwrap_or(false) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive completed days inside `range`.
pub fn longest_streak(entries: &[Entry], range: &DateRange) -> u32 {
    let days = completion_map(entries);
    let mut longest = 0;
    let mut run = 0;
    for day in range.days() {
        if days.get(&day).copied().unwrap_or(false) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// Change in completion rate against the preceding range of equal length,
/// in percentage points.
pub fn trend(entries: &[Entry], range: &DateRange) -> f64 {
    let days = completion_map(entries);
    let previous = range
        .preceding()
        .map_or(0.0, |preceding| rate_of(&days, &preceding));
    rate_of(&days, range) - previous
}

pub fn habit_stats(entries: &[Entry], range: &DateRange) -> HabitStats {
    HabitStats {
        rate: round1(completion_rate(entries, range)),
        current_streak: current_streak(entries, range),
        longest_streak: longest_streak(entries, range),
        trend: round1(trend(entries, range)),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let count = values.len();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

pub fn build_month_stats(data: &AppData, range: &DateRange) -> MonthStatsResponse {
    let habits: Vec<MonthHabitStats> = data
        .sorted_habits()
        .into_iter()
        .map(|habit| {
            let entries = data.habit_entries(habit.id);
            let stats = habit_stats(&entries, range);
            MonthHabitStats {
                id: habit.id,
                name: habit.name.clone(),
                rate: stats.rate,
                current_streak: stats.current_streak,
                longest_streak: stats.longest_streak,
                trend: stats.trend,
            }
        })
        .collect();

    MonthStatsResponse {
        overall_rate: round1(mean(habits.iter().map(|habit| habit.rate))),
        start_date: range.start,
        end_date: range.end,
        habits,
    }
}

pub fn build_week(data: &AppData, year: i32, week: u32, range: &DateRange) -> WeekResponse {
    let habits: Vec<WeekHabit> = data
        .sorted_habits()
        .into_iter()
        .map(|habit| {
            let entries = data.entries_in(habit.id, range);
            let recorded = completion_map(&entries);
            WeekHabit {
                id: habit.id,
                name: habit.name.clone(),
                rate: round1(rate_of(&recorded, range)),
                days: range
                    .days()
                    .map(|day| (day, recorded.get(&day).copied().unwrap_or(false)))
                    .collect(),
            }
        })
        .collect();

    WeekResponse {
        year,
        week,
        start_date: range.start,
        end_date: range.end,
        overall_rate: round1(mean(habits.iter().map(|habit| habit.rate))),
        habits,
    }
}

pub fn build_today(data: &AppData) -> TodayResponse {
    build_today_at(Local::now().date_naive(), data)
}

pub fn build_today_at(today: NaiveDate, data: &AppData) -> TodayResponse {
    let habits: Vec<TodayHabit> = data
        .sorted_habits()
        .into_iter()
        .map(|habit| TodayHabit {
            id: habit.id,
            name: habit.name.clone(),
            category: habit.category.clone(),
            emoji: habit.emoji.clone(),
            position: habit.position,
            completed: data.is_completed(habit.id, today),
        })
        .collect();

    let today_rate = if habits.is_empty() {
        0.0
    } else {
        let done = habits.iter().filter(|habit| habit.completed).count();
        round1(done as f64 * 100.0 / habits.len() as f64)
    };

    TodayResponse {
        date: today,
        today_rate,
        habits,
    }
}

/// Counts over recorded entries only, unlike the range-based rates above.
pub fn build_summary(data: &AppData) -> SummaryResponse {
    let habits: Vec<HabitSummary> = data
        .sorted_habits()
        .into_iter()
        .map(|habit| {
            let entries = data.habit_entries(habit.id);
            let completed = entries.iter().filter(|entry| entry.completed).count();
            HabitSummary {
                id: habit.id,
                name: habit.name.clone(),
                category: habit.category.clone(),
                completed,
                recorded: entries.len(),
                rate: ratio(completed, entries.len()),
            }
        })
        .collect();

    let total_entries = data.all_entries().count();
    let completed_entries = data.all_entries().filter(|entry| entry.completed).count();

    SummaryResponse {
        total_habits: habits.len(),
        total_entries,
        completed_entries,
        overall_rate: ratio(completed_entries, total_entries),
        habits,
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 * 100.0 / whole as f64)
    }
}

/// ISO year and week of `date`.
pub fn iso_week_of(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap() + Duration::days(n)
    }

    fn entries(pattern: &[bool]) -> Vec<Entry> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, &completed)| Entry {
                id: i as u64 + 1,
                habit_id: 1,
                date: day(i as i64),
                completed,
            })
            .collect()
    }

    fn range_of(len: i64) -> DateRange {
        DateRange::new(day(0), day(len - 1))
    }

    #[test]
    fn all_completed_range_has_full_streak() {
        let history = entries(&[true; 9]);
        assert_eq!(current_streak(&history, &range_of(9)), 9);
        assert_eq!(longest_streak(&history, &range_of(9)), 9);
    }

    #[test]
    fn nothing_completed_has_no_streak() {
        let history = entries(&[false; 6]);
        assert_eq!(current_streak(&history, &range_of(6)), 0);
        assert_eq!(longest_streak(&history, &range_of(6)), 0);
        assert_eq!(completion_rate(&history, &range_of(6)), 0.0);
    }

    #[test]
    fn break_near_the_end_resets_current_streak() {
        let history = entries(&[true, true, true, true, true, false, true, true]);
        let range = range_of(8);
        assert_eq!(current_streak(&history, &range), 2);
        assert_eq!(longest_streak(&history, &range), 5);
    }

    #[test]
    fn missing_days_count_as_incomplete() {
        let mut history = entries(&[true, true, true]);
        history.remove(1);
        let range = range_of(3);
        assert_eq!(longest_streak(&history, &range), 1);
        assert_eq!(current_streak(&history, &range), 1);
        assert!((completion_rate(&history, &range) - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn seven_of_ten_is_seventy_percent() {
        let history = entries(&[
            true, true, false, true, true, false, true, true, false, true,
        ]);
        assert_eq!(completion_rate(&history, &range_of(10)), 70.0);
    }

    #[test]
    fn trend_compares_with_preceding_period() {
        let mut pattern = vec![true; 6];
        pattern.extend([false; 4]);
        pattern.extend([true; 8]);
        pattern.extend([false; 2]);
        let history = entries(&pattern);
        let current = DateRange::new(day(10), day(19));
        assert_eq!(current.preceding(), Some(range_of(10)));
        assert!((trend(&history, &current) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn current_streak_reaches_back_past_range_start() {
        let history = entries(&[true; 5]);
        let range = DateRange::new(day(3), day(4));
        assert_eq!(current_streak(&history, &range), 5);
        assert_eq!(longest_streak(&history, &range), 2);
    }

    #[test]
    fn empty_range_is_harmless() {
        let history = entries(&[true; 3]);
        let range = DateRange::new(day(2), day(1));
        assert_eq!(range.len_days(), 0);
        assert_eq!(completion_rate(&history, &range), 0.0);
        assert_eq!(current_streak(&history, &range), 0);
        assert_eq!(longest_streak(&history, &range), 0);
    }

    #[test]
    fn earliest_month_has_no_preceding_period() {
        let range = DateRange::month(NaiveDate::MIN.year(), 1).unwrap();
        assert_eq!(range.start, NaiveDate::MIN);
        assert_eq!(range.preceding(), None);

        let mut data = AppData::default();
        let habit = data.create_habit("Read".into(), None, None, Utc::now());
        data.toggle_entry(habit, range.start, Some(true));
        let stats = build_month_stats(&data, &range);
        assert_eq!(stats.habits[0].rate, 3.2);
        assert_eq!(stats.habits[0].trend, 3.2);
    }

    #[test]
    fn latest_iso_week_stays_representable() {
        let range = DateRange::iso_week(NaiveDate::MAX.year(), 52).unwrap();
        assert_eq!(range.end.weekday(), Weekday::Sun);
        assert!(range.end < NaiveDate::MAX);
        assert!(DateRange::iso_week(NaiveDate::MAX.year(), 53).is_none());
    }

    #[test]
    fn month_ranges_cover_whole_months() {
        let december = DateRange::month(2024, 12).unwrap();
        assert_eq!(december.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let february = DateRange::month(2024, 2).unwrap();
        assert_eq!(february.len_days(), 29);
        assert!(DateRange::month(2024, 13).is_none());
    }

    #[test]
    fn month_stats_average_habit_rates() {
        let mut data = AppData::default();
        let read = data.create_habit("Read".into(), None, None, Utc::now());
        let walk = data.create_habit("Walk".into(), None, None, Utc::now());
        let range = DateRange::month(2025, 2).unwrap();
        for date in range.days() {
            data.toggle_entry(read, date, Some(true));
        }
        for date in range.days().take(7) {
            data.toggle_entry(walk, date, Some(true));
        }

        let stats = build_month_stats(&data, &range);
        assert_eq!(stats.habits.len(), 2);
        assert_eq!(stats.habits[0].rate, 100.0);
        assert_eq!(stats.habits[0].current_streak, 28);
        assert_eq!(stats.habits[0].trend, 100.0);
        assert_eq!(stats.habits[1].rate, 25.0);
        assert_eq!(stats.habits[1].current_streak, 0);
        assert_eq!(stats.habits[1].longest_streak, 7);
        assert_eq!(stats.overall_rate, 62.5);
    }

    #[test]
    fn today_rate_counts_completed_habits() {
        let mut data = AppData::default();
        let today = day(0);
        let first = data.create_habit("Read".into(), None, None, Utc::now());
        data.create_habit("Walk".into(), None, None, Utc::now());
        data.create_habit("Sleep".into(), None, None, Utc::now());
        data.toggle_entry(first, today, None);

        let view = build_today_at(today, &data);
        assert_eq!(view.habits.len(), 3);
        assert!(view.habits[0].completed);
        assert_eq!(view.today_rate, 33.3);
    }

    #[test]
    fn week_view_lists_every_day() {
        let mut data = AppData::default();
        let habit = data.create_habit("Read".into(), None, None, Utc::now());
        let range = DateRange::iso_week(2025, 10).unwrap();
        assert_eq!(range.start.weekday(), Weekday::Mon);
        data.toggle_entry(habit, range.start, Some(true));
        data.toggle_entry(habit, range.end, Some(false));

        let week = build_week(&data, 2025, 10, &range);
        let days = &week.habits[0].days;
        assert_eq!(days.len(), 7);
        assert!(days[&range.start]);
        assert_eq!(days.values().filter(|done| **done).count(), 1);
        assert_eq!(week.habits[0].rate, 14.3);
        assert_eq!(iso_week_of(range.end), (2025, 10));
    }
}
