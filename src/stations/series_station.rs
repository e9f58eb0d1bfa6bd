use crate::stations::error::StationError;
use crate::stations::source::{StationCore, StationKind, StationSource};
use crate::types::period::DateRange;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Field holding a record's `YYYY-MM-DD HH:MM:SS` timestamp.
pub const TIME_KEY: &str = "TmStamp";

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A station serving arbitrary date ranges in one request:
/// `GET url?id=<id>&rptdate=<start>&rptend=<end>`.
#[derive(Debug)]
pub struct SeriesStation {
    core: StationCore,
    id: String,
}

impl SeriesStation {
    pub fn new(core: StationCore, id: impl Into<String>) -> Self {
        Self {
            core,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Parses a station timestamp such as `"2024-01-01 00:00:00"`; stations report UTC.
pub(crate) fn parse_tm_stamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

#[async_trait]
impl StationSource for SeriesStation {
    fn core(&self) -> &StationCore {
        &self.core
    }

    fn kind(&self) -> StationKind {
        StationKind::Series
    }

    async fn get_raw_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<Value>, StationError> {
        let range = DateRange::new(start, end);
        let key = format!("download_data-{}", range);
        let params = [
            ("id", self.id.clone()),
            ("rptdate", start.format("%Y-%m-%d").to_string()),
            ("rptend", end.format("%Y-%m-%d").to_string()),
        ];
        self.core.fetch_data(&key, &params).await
    }

    fn record_timestamp(&self, record: &Map<String, Value>) -> Result<DateTime<Utc>, StationError> {
        match record.get(TIME_KEY) {
            Some(Value::String(text)) => {
                parse_tm_stamp(text).ok_or_else(|| self.core.invalid_timestamp(text.as_str()))
            }
            Some(other) => Err(self.core.invalid_timestamp(other.to_string())),
            None => Err(self.core.invalid_timestamp(format!("<missing {TIME_KEY}>"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::types::data_type::DataType;
    use crate::types::location::LatLon;
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn station(transport: Arc<FakeTransport>) -> SeriesStation {
        let core = StationCore::builder()
            .name("Homewood")
            .url("https://example.org/data")
            .coords(LatLon(39.0853, -120.1608))
            .data_types(vec![DataType::new("Temp", "Temp", "f", "c")])
            .transport(transport)
            .build();
        SeriesStation::new(core, "7")
    }

    fn three_days() -> Value {
        json!([
            {"TmStamp": "2024-01-01 00:00:00", "Temp": "10"},
            {"TmStamp": "2024-01-02 00:00:00", "Temp": "12"},
            {"TmStamp": "2024-01-03 00:00:00", "Temp": "x"},
        ])
    }

    #[test]
    fn test_parse_tm_stamp() {
        let expected = Utc.with_ymd_and_hms(2023, 7, 4, 13, 30, 5).unwrap();
        assert_eq!(parse_tm_stamp("2023-07-04 13:30:05"), Some(expected));
        assert_eq!(parse_tm_stamp(" 2023-07-04 13:30:05 "), Some(expected));
        assert_eq!(parse_tm_stamp("2023-07-04T13:30:05"), Some(expected));
        assert!(parse_tm_stamp("2023-07-04 13:30:05.250").is_some());
        assert_eq!(parse_tm_stamp("yesterday"), None);
    }

    #[tokio::test]
    async fn test_end_to_end_normalization() -> Result<(), StationError> {
        let transport = Arc::new(FakeTransport::constant(three_days()));
        let station = station(Arc::clone(&transport));

        let series = station
            .get_normalized_series(date(2024, 1, 1), date(2024, 1, 3))
            .await?;

        assert_eq!(series.len(), 3);
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(series[0].get("Temp"), Some(50.0));
        assert!((series[1].get("Temp").unwrap() - 53.6).abs() < 1e-9);
        assert_eq!(series[2].get("Temp"), Some(32.0));
        assert_eq!(
            series[2].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()
        );

        assert_eq!(
            transport.requests(),
            vec![vec![
                ("id".to_string(), "7".to_string()),
                ("rptdate".to_string(), "2024-01-01".to_string()),
                ("rptend".to_string(), "2024-01-03".to_string()),
            ]]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unsorted_records_come_back_sorted() -> Result<(), StationError> {
        let transport = Arc::new(FakeTransport::constant(json!([
            {"TmStamp": "2024-01-03 00:00:00", "Temp": "3"},
            {"TmStamp": "2024-01-01 00:00:00", "Temp": "1"},
            {"TmStamp": "2024-01-02 12:00:00", "Temp": "2"},
            {"TmStamp": "2024-01-02 00:00:00", "Temp": "2"},
        ])));
        let station = station(transport);

        let series = station
            .get_normalized_series(date(2024, 1, 1), date(2024, 1, 3))
            .await?;
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let latest = station
            .get_most_recent_data_point(date(2024, 1, 1), date(2024, 1, 3))
            .await?;
        assert_eq!(
            latest.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_requests_fetch_once() {
        let transport =
            Arc::new(FakeTransport::constant(three_days()).with_delay(Duration::from_millis(20)));
        let station = Arc::new(station(Arc::clone(&transport)));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let station = Arc::clone(&station);
                tokio::spawn(async move {
                    station
                        .get_normalized_series(date(2024, 1, 1), date(2024, 1, 3))
                        .await
                        .map(|series| series.len())
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 3);
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let transport = Arc::new(FakeTransport::constant(three_days()));
        let station = station(Arc::clone(&transport));
        let (start, end) = (date(2024, 1, 1), date(2024, 1, 3));

        station.get_normalized_series(start, end).await.unwrap();
        tokio::time::advance(Duration::from_secs(60 * 60) - Duration::from_millis(1)).await;
        station.get_normalized_series(start, end).await.unwrap();
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        station.get_normalized_series(start, end).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_distinct_ranges_are_cached_separately() {
        let transport = Arc::new(FakeTransport::constant(three_days()));
        let station = station(Arc::clone(&transport));

        station
            .get_normalized_series(date(2024, 1, 1), date(2024, 1, 3))
            .await
            .unwrap();
        station
            .get_normalized_series(date(2024, 1, 1), date(2024, 1, 4))
            .await
            .unwrap();
        station
            .get_raw_series(date(2024, 1, 1), date(2024, 1, 4))
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_data_is_cached() {
        let transport = Arc::new(FakeTransport::constant(json!([
            {"TmStamp": "2024-01-01 00:00:00", "Temp": "10"},
            {"TmStamp": "2024-01-02 00:00:00", "Temp": "12"},
        ])));
        let station = station(Arc::clone(&transport));
        let (start, end) = (date(2024, 1, 1), date(2024, 1, 2));

        for _ in 0..3 {
            let err = station.get_normalized_series(start, end).await.unwrap_err();
            assert!(matches!(
                err,
                StationError::InsufficientData { points: 2, ref station } if station == "Homewood"
            ));
        }
        assert_eq!(transport.calls(), 1);

        let err = station
            .get_most_recent_data_point(start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, StationError::InsufficientData { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_data_retried_after_negative_ttl() {
        let transport = Arc::new(FakeTransport::constant(json!([])));
        let station = station(Arc::clone(&transport));
        let (start, end) = (date(2024, 1, 1), date(2024, 1, 2));

        assert!(station.get_normalized_series(start, end).await.is_err());
        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert!(station.get_normalized_series(start, end).await.is_err());

        // The raw payload is still cached, so only the normalized entry expired.
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_is_not_cached() {
        let transport = Arc::new(FakeTransport::offline());
        let station = station(Arc::clone(&transport));
        let (start, end) = (date(2024, 1, 1), date(2024, 1, 3));

        for _ in 0..2 {
            let err = station.get_normalized_series(start, end).await.unwrap_err();
            assert!(matches!(err, StationError::NetworkFailure { .. }));
        }
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_bad_timestamp() {
        let transport = Arc::new(FakeTransport::constant(json!([
            {"TmStamp": "2024-01-01 00:00:00", "Temp": "10"},
            {"TmStamp": "not a time", "Temp": "12"},
            {"Temp": "12"},
        ])));
        let station = station(transport);

        let err = station
            .get_normalized_series(date(2024, 1, 1), date(2024, 1, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, StationError::InvalidTimestamp { ref value, .. } if value == "not a time"));
    }

    #[tokio::test]
    async fn test_most_recent_value() -> Result<(), StationError> {
        let station = station(Arc::new(FakeTransport::constant(three_days())));
        let (start, end) = (date(2024, 1, 1), date(2024, 1, 3));

        assert_eq!(station.get_most_recent_value(start, end, "Temp").await?, Some(32.0));
        assert_eq!(station.get_most_recent_value(start, end, "Wind").await?, None);
        assert!(station.has_data_type("Temp"));
        assert_eq!(station.kind(), StationKind::Series);
        Ok(())
    }
}
