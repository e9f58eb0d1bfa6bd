use crate::stations::error::StationError;
use crate::stations::source::{StationCore, StationKind, StationSource};
use crate::types::period::{DateRange, Year};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use futures_util::future::try_join_all;
use log::debug;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Field holding the calendar year a record summarizes.
pub const YEAR_KEY: &str = "Year";

/// A station publishing one summary record per calendar year: `GET url?id=<year>`.
///
/// Each year is downloaded and cached on its own, so overlapping ranges reuse the
/// years they share.
#[derive(Debug)]
pub struct AnnualStation {
    core: StationCore,
}

impl AnnualStation {
    pub fn new(core: StationCore) -> Self {
        Self { core }
    }

    /// The record for one year, `None` if the station has nothing for it.
    async fn download_year(&self, year: Year) -> Result<Option<Value>, StationError> {
        let key = format!("download_data-{}", year.get());
        let params = [("id", year.get().to_string())];
        let payload = self.core.fetch_data(&key, &params).await?;

        // Responses wrap the year's record in a single-element array.
        let record = match payload.as_ref() {
            Value::Array(records) => records.first().cloned(),
            Value::Object(_) => Some(payload.as_ref().clone()),
            Value::Null => None,
            other => {
                return Err(self
                    .core
                    .unexpected_payload(format!("unexpected data for {}: {}", year, other)))
            }
        };
        if record.is_none() {
            debug!("Station '{}' has no record for {}", self.core.name(), year);
        }
        Ok(record)
    }
}

fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl StationSource for AnnualStation {
    fn core(&self) -> &StationCore {
        &self.core
    }

    fn kind(&self) -> StationKind {
        StationKind::Annual
    }

    async fn get_raw_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<Value>, StationError> {
        let years = DateRange::new(start, end).years().map(Year);
        let records = try_join_all(years.map(|year| self.download_year(year))).await?;
        Ok(Arc::new(Value::Array(records.into_iter().flatten().collect())))
    }

    fn record_timestamp(&self, record: &Map<String, Value>) -> Result<DateTime<Utc>, StationError> {
        let value = record.get(YEAR_KEY);
        value
            .and_then(parse_year)
            .and_then(|year| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single())
            .ok_or_else(|| {
                self.core.invalid_timestamp(
                    value.map_or_else(|| format!("<missing {YEAR_KEY}>"), Value::to_string),
                )
            })
    }
}
