//! Canonical exchange-rate records and their derivation from raw snapshots
//!
//! A provider snapshot expresses every rate in units of its base currency.
//! Each (currency, rate) entry becomes one canonical record carrying both
//! conversion directions, serialized as one JSON object per line.

use crate::error::{IngestError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw historical snapshot as returned by the rate provider
///
/// `rates` maps a currency code to units of `base` per unit of that
/// currency. Immutable after receipt; scoped to one (date, base) fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSnapshot {
    pub base: String,
    pub timestamp: i64,
    pub rates: HashMap<String, f64>,
}

/// Canonical per-currency-pair record
///
/// Invariant: `units_per_currency == 1.0 / currencies_per_unit`, where
/// `currencies_per_unit` is exactly the raw provider value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub date: NaiveDate,
    pub base: String,
    pub currency: String,
    pub units_per_currency: f64,
    pub currencies_per_unit: f64,
}

impl RawSnapshot {
    /// Derive one canonical record per (currency, rate) entry
    ///
    /// Output order is arbitrary; consumers treat it as an unordered batch.
    /// A zero rate has no finite inverse and is surfaced as an error rather
    /// than skipped. If the provider lists the base against itself, the
    /// degenerate self-referencing record passes through unchanged.
    pub fn exchange_rates(&self, date: NaiveDate) -> Result<Vec<ExchangeRate>> {
        let mut records = Vec::with_capacity(self.rates.len());
        for (currency, &rate) in &self.rates {
            if rate == 0.0 {
                return Err(IngestError::ZeroRate {
                    base: self.base.clone(),
                    currency: currency.clone(),
                });
            }
            records.push(ExchangeRate {
                date,
                base: self.base.clone(),
                currency: currency.clone(),
                units_per_currency: 1.0 / rate,
                currencies_per_unit: rate,
            });
        }
        Ok(records)
    }
}

/// Serialize a record batch as newline-delimited JSON
///
/// One JSON object per line, no trailing newline, no enclosing array.
pub fn to_ndjson(records: &[ExchangeRate]) -> Result<Vec<u8>> {
    let lines = records
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines.join("\n").into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn snapshot(base: &str, rates: &[(&str, f64)]) -> RawSnapshot {
        RawSnapshot {
            base: base.to_string(),
            timestamp: 1,
            rates: rates.iter().map(|(c, r)| (c.to_string(), *r)).collect(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_single_rate_derivation() {
        let snap = snapshot("USD", &[("EUR", 0.5)]);
        let records = snap.exchange_rates(date()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date());
        assert_eq!(records[0].base, "USD");
        assert_eq!(records[0].currency, "EUR");
        assert_eq!(records[0].units_per_currency, 2.0);
        assert_eq!(records[0].currencies_per_unit, 0.5);
    }

    #[test]
    fn test_one_record_per_rate() {
        let snap = snapshot("SGD", &[("USD", 0.74), ("EUR", 0.68), ("JPY", 110.2)]);
        let records = snap.exchange_rates(date()).unwrap();

        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.base, "SGD");
            assert_eq!(record.date, date());
        }
    }

    #[test]
    fn test_reciprocal_invariant() {
        let snap = snapshot("USD", &[("GBP", 0.79), ("CHF", 0.91)]);
        for record in snap.exchange_rates(date()).unwrap() {
            assert_relative_eq!(
                record.units_per_currency * record.currencies_per_unit,
                1.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_zero_rate_is_an_error() {
        let snap = snapshot("USD", &[("XAU", 0.0)]);
        let err = snap.exchange_rates(date()).unwrap_err();

        match err {
            IngestError::ZeroRate { base, currency } => {
                assert_eq!(base, "USD");
                assert_eq!(currency, "XAU");
            }
            other => panic!("expected ZeroRate, got {other}"),
        }
    }

    #[test]
    fn test_self_referencing_base_passes_through() {
        let snap = snapshot("USD", &[("USD", 1.0)]);
        let records = snap.exchange_rates(date()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].base, records[0].currency);
        assert_eq!(records[0].units_per_currency, 1.0);
    }

    #[test]
    fn test_empty_snapshot_yields_no_records() {
        let snap = snapshot("USD", &[]);
        assert!(snap.exchange_rates(date()).unwrap().is_empty());
    }

    #[test]
    fn test_record_serde_round_trip() {
        let record = ExchangeRate {
            date: date(),
            base: "USD".to_string(),
            currency: "EUR".to_string(),
            units_per_currency: 2.0,
            currencies_per_unit: 0.5,
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: ExchangeRate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_json_field_names() {
        let record = ExchangeRate {
            date: date(),
            base: "USD".to_string(),
            currency: "EUR".to_string(),
            units_per_currency: 2.0,
            currencies_per_unit: 0.5,
        };

        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["date"], "2024-03-10");
        assert_eq!(value["base"], "USD");
        assert_eq!(value["currency"], "EUR");
        assert_eq!(value["units_per_currency"], 2.0);
        assert_eq!(value["currencies_per_unit"], 0.5);
    }

    #[test]
    fn test_ndjson_layout() {
        let snap = snapshot("USD", &[("EUR", 0.5), ("GBP", 0.8)]);
        let records = snap.exchange_rates(date()).unwrap();
        let payload = to_ndjson(&records).unwrap();
        let text = String::from_utf8(payload).unwrap();

        assert_eq!(text.lines().count(), 2);
        assert!(!text.ends_with('\n'));
        assert!(!text.starts_with('['));
        for line in text.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["base"], "USD");
        }
    }

    #[test]
    fn test_ndjson_of_empty_batch_is_empty() {
        assert!(to_ndjson(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_deserialization() {
        let body = r#"{"base":"USD","timestamp":1710028800,"rates":{"EUR":0.5,"GBP":0.8}}"#;
        let snap: RawSnapshot = serde_json::from_str(body).unwrap();

        assert_eq!(snap.base, "USD");
        assert_eq!(snap.timestamp, 1_710_028_800);
        assert_eq!(snap.rates.len(), 2);
        assert_eq!(snap.rates["EUR"], 0.5);
    }

    proptest! {
        #[test]
        fn prop_derivation_preserves_count_and_inverse(
            rates in prop::collection::hash_map("[A-Z]{3}", 1e-6f64..1e6, 0..32)
        ) {
            let snap = RawSnapshot {
                base: "USD".to_string(),
                timestamp: 0,
                rates: rates.clone(),
            };
            let records = snap.exchange_rates(date()).unwrap();

            prop_assert_eq!(records.len(), rates.len());
            for record in &records {
                prop_assert_eq!(record.date, date());
                prop_assert_eq!(record.base.as_str(), "USD");
                prop_assert_eq!(record.currencies_per_unit, rates[&record.currency]);
                prop_assert_eq!(record.units_per_currency, 1.0 / record.currencies_per_unit);
            }
        }
    }
}
