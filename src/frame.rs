//! Tabular view of a computed schedule.

use crate::schedule::Schedule;
use crate::task::Task;
use chrono::NaiveDateTime;
use polars::prelude::TimeUnit as PlTimeUnit;
use polars::prelude::*;

fn datetime_to_ms(value: Option<NaiveDateTime>) -> Option<i64> {
    value.map(|dt| dt.and_utc().timestamp_millis())
}

fn datetime_column(name: &'static str, values: Vec<Option<i64>>) -> PolarsResult<Column> {
    Ok(Series::new(PlSmallStr::from_static(name), values)
        .cast(&DataType::Datetime(PlTimeUnit::Milliseconds, None))?
        .into_column())
}

impl Schedule {
    /// One row per scheduled task, in topological order.
    ///
    /// Dates are millisecond datetimes; rows for tasks without a completed
    /// pass hold nulls.
    pub fn dataframe(&self) -> PolarsResult<DataFrame> {
        let rows: Vec<&Task> = self
            .scheduled_order()
            .iter()
            .filter_map(|&id| self.task(id))
            .collect();

        let ids: Vec<i32> = rows.iter().map(|t| t.id).collect();
        let names: Vec<&str> = rows.iter().map(|t| t.name.as_str()).collect();
        let early_start = rows.iter().map(|t| datetime_to_ms(t.early_start)).collect();
        let early_finish = rows.iter().map(|t| datetime_to_ms(t.early_finish)).collect();
        let late_start = rows.iter().map(|t| datetime_to_ms(t.late_start)).collect();
        let late_finish = rows.iter().map(|t| datetime_to_ms(t.late_finish)).collect();
        let total_float: Vec<Option<f64>> = rows
            .iter()
            .map(|t| t.total_float.map(|float| float.value))
            .collect();
        let is_critical: Vec<Option<bool>> = rows.iter().map(|t| t.is_critical).collect();

        let columns = vec![
            Series::new(PlSmallStr::from_static("id"), ids).into_column(),
            Series::new(PlSmallStr::from_static("name"), names).into_column(),
            datetime_column("early_start", early_start)?,
            datetime_column("early_finish", early_finish)?,
            datetime_column("late_start", late_start)?,
            datetime_column("late_finish", late_finish)?,
            Series::new(PlSmallStr::from_static("total_float_days"), total_float).into_column(),
            Series::new(PlSmallStr::from_static("is_critical"), is_critical).into_column(),
        ];
        DataFrame::new(columns)
    }
}
