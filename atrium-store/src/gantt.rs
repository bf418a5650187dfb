//! Timeline layout for a project's tasks.
//!
//! Everything is measured in whole days from the start of a shared axis and
//! scaled by `px_per_day`. A task missing a start or due date uses `now` for
//! that bound, so such bars can collapse to a single day.

use chrono::{DateTime, Datelike, Duration, Utc};

use atrium_core::AtriumConfigSnapshot;
use atrium_model::{Task, TaskStatus};

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GanttOptions {
    pub px_per_day: u32,
    pub padding_days: u32,
}

impl Default for GanttOptions {
    fn default() -> Self {
        Self {
            px_per_day: 24,
            padding_days: 2,
        }
    }
}

impl GanttOptions {
    pub fn from_snapshot(snapshot: &AtriumConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            px_per_day: snapshot
                .get_u64("gantt.px_per_day")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.px_per_day),
            padding_days: snapshot
                .get_u64("gantt.padding_days")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.padding_days),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GanttBar {
    pub task_id: String,
    pub name: String,
    pub status: TaskStatus,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Pixels from the axis start.
    pub left: i64,
    pub width: i64,
    /// Fill of the bar in percent, independent of `width`.
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayMarker {
    pub index: i64,
    pub date: DateTime<Utc>,
    pub offset: i64,
    pub labelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GanttLayout {
    pub axis_start: DateTime<Utc>,
    pub axis_end: DateTime<Utc>,
    pub total_days: i64,
    pub px_per_day: u32,
    pub bars: Vec<GanttBar>,
    pub markers: Vec<DayMarker>,
}

impl GanttLayout {
    /// Total timeline width in pixels.
    pub fn width(&self) -> i64 {
        self.total_days * i64::from(self.px_per_day)
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MS_PER_DAY
}

fn bounds(task: &Task, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (task.start_date.unwrap_or(now), task.due_date.unwrap_or(now))
}

/// Axis `[earliest - padding, latest + padding]` over every start and due
/// date. No tasks gives `[now, now]`.
pub fn axis(tasks: &[Task], now: DateTime<Utc>, options: GanttOptions) -> (DateTime<Utc>, DateTime<Utc>) {
    let mut dates = tasks.iter().flat_map(|task| {
        let (start, end) = bounds(task, now);
        [start, end]
    });
    let Some(first) = dates.next() else {
        return (now, now);
    };
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    let padding = Duration::days(i64::from(options.padding_days));
    (min - padding, max + padding)
}

pub fn layout(tasks: &[Task], now: DateTime<Utc>, options: GanttOptions) -> GanttLayout {
    let (axis_start, axis_end) = axis(tasks, now, options);
    let total_days = days_between(axis_start, axis_end).ceil() as i64;
    let px = i64::from(options.px_per_day);

    let bars = tasks
        .iter()
        .map(|task| {
            let (start, end) = bounds(task, now);
            let offset_days = days_between(axis_start, start).floor() as i64;
            let duration_days = (days_between(start, end).ceil() as i64 + 1).max(1);
            GanttBar {
                task_id: task.id.clone(),
                name: task.name.clone(),
                status: task.status,
                start,
                end,
                left: offset_days * px,
                width: duration_days * px,
                progress: task.percentage.min(100),
            }
        })
        .collect();

    let markers = (0..=total_days)
        .map(|index| {
            let date = axis_start + Duration::days(index);
            DayMarker {
                index,
                date,
                offset: index * px,
                labelled: index == 0 || index == total_days || index % 7 == 0 || date.day() == 1,
            }
        })
        .collect();

    GanttLayout {
        axis_start,
        axis_end,
        total_days,
        px_per_day: options.px_per_day,
        bars,
        markers,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap()
    }

    fn task(value: serde_json::Value) -> Task {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_task_list_collapses_to_now() {
        let now = at(10);
        let layout = layout(&[], now, GanttOptions::default());
        assert_eq!((layout.axis_start, layout.axis_end), (now, now));
        assert_eq!(layout.total_days, 0);
        assert!(layout.bars.is_empty());
        assert_eq!(layout.markers.len(), 1);
        assert!(layout.markers[0].labelled);
    }

    #[test]
    fn bars_are_positioned_from_the_padded_axis() {
        let tasks = vec![
            task(json!({"_id": "t1", "name": "Design", "startDate": "2024-03-05T00:00:00Z",
                        "dueDate": "2024-03-07T00:00:00Z", "percentage": "40"})),
            task(json!({"_id": "t2", "name": "Build", "startDate": "2024-03-08T00:00:00Z",
                        "dueDate": "2024-03-12T00:00:00Z", "status": "in-progress"})),
        ];
        let layout = layout(&tasks, at(20), GanttOptions::default());

        assert_eq!(layout.axis_start, at(3));
        assert_eq!(layout.axis_end, at(14));
        assert_eq!(layout.total_days, 11);
        assert_eq!(layout.width(), 11 * 24);

        let design = &layout.bars[0];
        assert_eq!(design.left, 2 * 24);
        assert_eq!(design.width, 3 * 24);
        assert_eq!(design.progress, 40);

        let build = &layout.bars[1];
        assert_eq!(build.left, 5 * 24);
        assert_eq!(build.width, 5 * 24);
        assert_eq!(build.status, TaskStatus::InProgress);
    }

    #[test]
    fn missing_dates_default_to_now() {
        let now = at(10);
        let tasks = vec![task(json!({"_id": "t1", "name": "Undated"}))];
        let layout = layout(&tasks, now, GanttOptions::default());

        assert_eq!(layout.axis_start, at(8));
        assert_eq!(layout.bars[0].start, now);
        assert_eq!(layout.bars[0].left, 2 * 24);
        assert_eq!(layout.bars[0].width, 24);
    }

    #[test]
    fn markers_label_weeks_ends_and_month_starts() {
        let tasks = vec![task(json!({"_id": "t1", "startDate": "2024-02-20T00:00:00Z",
                                     "dueDate": "2024-03-10T00:00:00Z"}))];
        let layout = layout(&tasks, at(1), GanttOptions::default());
        let labelled: Vec<i64> = layout
            .markers
            .iter()
            .filter(|m| m.labelled)
            .map(|m| m.index)
            .collect();

        // Axis runs Feb 18 .. Mar 12; Mar 1 is day 12.
        assert_eq!(layout.total_days, 23);
        assert_eq!(labelled, vec![0, 7, 12, 14, 21, 23]);
        assert_eq!(layout.markers[3].offset, 72);
    }

    #[test]
    fn options_come_from_config() {
        let mut map = HashMap::new();
        map.insert("gantt.px_per_day".to_string(), "10".to_string());
        let options = GanttOptions::from_snapshot(&AtriumConfigSnapshot::from(map));
        assert_eq!(options.px_per_day, 10);
        assert_eq!(options.padding_days, 2);
    }
}
