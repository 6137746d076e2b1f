//! # Load-Profile Arranging
//!
//! A profile answer is a flat list of data sets: one header element, then
//! fixed-size rows whose layout depends on the manufacturer.
//!
//! | Layout | Code  | Row | Fields                                         |
//! |--------|-------|-----|------------------------------------------------|
//! | Luna   | `LUN` | 14  | `YYYY-MM-DD`, `hh:mm`, energy `*kWh`, 11 unused |
//! | Makel  | `MSY` | 9   | `YYMMDDhhmm`, 8 positional values               |
//!
//! A trailing incomplete row is logged and dropped.

use crate::error::{Iec62056Error, Result};
use crate::iec::message::{Command, CommandMessage, DataSet};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::Serialize;

/// One load-profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileData {
    pub date: NaiveDateTime,
    pub values: ProfileValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProfileValues {
    /// Active energy import register (1.8.0), unit stripped.
    Luna { f180: String },
    /// Channel values in the order the meter sent them.
    Makel(Vec<String>),
}

/// Manufacturer-specific profile request and row layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileLayout {
    Luna,
    Makel,
}

impl ProfileLayout {
    /// Looks up the layout for a manufacturer code as sent in the
    /// identification (case-sensitive).
    pub fn for_manufacturer(manufacturer_id: &str) -> Result<Self> {
        match manufacturer_id {
            "LUN" => Ok(ProfileLayout::Luna),
            "MSY" => Ok(ProfileLayout::Makel),
            other => Err(Iec62056Error::UnsupportedManufacturer(other.to_string())),
        }
    }

    pub fn chunk_size(self) -> usize {
        match self {
            ProfileLayout::Luna => 14,
            ProfileLayout::Makel => 9,
        }
    }

    /// Builds the profile read for the inclusive date range.
    pub fn request(self, start: NaiveDate, end: NaiveDate) -> CommandMessage {
        match self {
            ProfileLayout::Luna => {
                let range = format!("{};{}", short_date(start), short_date(end));
                CommandMessage::new(
                    Command::Read,
                    '5',
                    Some(DataSet::with_address("P1", range)),
                )
            }
            ProfileLayout::Makel => {
                let range = format!("{}0000;{}0000", short_date(start), short_date(end));
                CommandMessage::new(
                    Command::Read,
                    '2',
                    Some(DataSet::with_address("P.01", range)),
                )
            }
        }
    }

    fn record(self, row: &[DataSet]) -> Result<ProfileData> {
        match self {
            ProfileLayout::Luna => {
                let packed = format!(
                    "{}{}",
                    row[0].value.replace('-', "").get(2..).unwrap_or_default(),
                    row[1].value.replace(':', "")
                );
                Ok(ProfileData {
                    date: decode_profile_date(&packed)?,
                    values: ProfileValues::Luna {
                        f180: row[2].value.replace("*kWh", ""),
                    },
                })
            }
            ProfileLayout::Makel => Ok(ProfileData {
                date: decode_profile_date(&row[0].value)?,
                values: ProfileValues::Makel(row[1..].iter().map(|d| d.value.clone()).collect()),
            }),
        }
    }
}

/// `YYMMDD`
fn short_date(date: NaiveDate) -> String {
    format!(
        "{:02}{:02}{:02}",
        date.year().rem_euclid(100),
        date.month(),
        date.day()
    )
}

/// Decodes a packed `YYMMDDhhmm` timestamp, year 20YY.
pub fn decode_profile_date(text: &str) -> Result<NaiveDateTime> {
    if text.len() != 10 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Iec62056Error::InvalidDate(text.to_string()));
    }
    let field = |range: std::ops::Range<usize>| -> u32 {
        text[range].parse().unwrap_or_default()
    };

    NaiveDate::from_ymd_opt(2000 + field(0..2) as i32, field(2..4), field(4..6))
        .and_then(|d| d.and_hms_opt(field(6..8), field(8..10), 0))
        .ok_or_else(|| Iec62056Error::InvalidDate(text.to_string()))
}

/// Turns the data sets of a profile answer into records.
pub fn arrange(manufacturer_id: &str, data_sets: &[DataSet]) -> Result<Vec<ProfileData>> {
    let layout = ProfileLayout::for_manufacturer(manufacturer_id)?;
    let rows = data_sets.get(1..).unwrap_or_default();
    let size = layout.chunk_size();

    let chunks = rows.chunks_exact(size);
    if !chunks.remainder().is_empty() {
        warn!(
            "Ignoring {} trailing profile fields (row size {size})",
            chunks.remainder().len()
        );
    }
    let records = chunks
        .map(|row| layout.record(row))
        .collect::<Result<Vec<_>>>()?;

    debug!("Arranged {} {:?} profile records", records.len(), layout);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iec::message::WireMessage;

    fn values(values: &[&str]) -> Vec<DataSet> {
        values.iter().map(|v| DataSet::new(*v)).collect()
    }

    #[test]
    fn test_decode_profile_date() {
        let date = decode_profile_date("2101050800").unwrap();
        assert_eq!(
            date,
            NaiveDate::from_ymd_opt(2021, 1, 5)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
        assert!(decode_profile_date("21010508").is_err());
        assert!(decode_profile_date("2113050800").is_err());
        assert!(decode_profile_date("21010508ab").is_err());
    }

    #[test]
    fn test_makel_rows() {
        let mut data = values(&["header"]);
        data.extend(values(&["2101050800", "1", "2", "3", "4", "5", "6", "7", "8"]));
        data.extend(values(&["2101050815", "a", "b", "c", "d", "e", "f", "g", "h"]));

        let records = arrange("MSY", &data).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].values,
            ProfileValues::Makel(
                ["a", "b", "c", "d", "e", "f", "g", "h"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            )
        );
    }

    #[test]
    fn test_luna_row_strips_unit() {
        let mut row = vec!["2021-01-05", "08:00", "123.456*kWh"];
        row.extend(std::iter::repeat("0").take(11));
        let mut data = values(&["P.01"]);
        data.extend(values(&row));

        let records = arrange("LUN", &data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, decode_profile_date("2101050800").unwrap());
        assert_eq!(
            records[0].values,
            ProfileValues::Luna {
                f180: "123.456".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_manufacturer() {
        assert!(matches!(
            arrange("ISK", &[]),
            Err(Iec62056Error::UnsupportedManufacturer(code)) if code == "ISK"
        ));
    }

    #[test]
    fn test_profile_requests() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 6).unwrap();

        let luna = ProfileLayout::Luna.request(start, end).to_bytes().unwrap();
        assert_eq!(&luna[..luna.len() - 1], b"\x01R5\x02P1(210105;210106)\x03");

        let makel = ProfileLayout::Makel.request(start, end).to_bytes().unwrap();
        assert_eq!(
            &makel[..makel.len() - 1],
            b"\x01R2\x02P.01(2101050000;2101060000)\x03"
        );
    }

    #[test]
    fn test_profile_requests_decode_to_themselves() {
        let day = NaiveDate::from_ymd_opt(2021, 1, 5).unwrap();
        for layout in [ProfileLayout::Luna, ProfileLayout::Makel] {
            let request = layout.request(day, day);
            let decoded = CommandMessage::from_bytes(&request.to_bytes().unwrap()).unwrap();
            assert_eq!(decoded, request);
        }
    }
}
