use chrono::NaiveDate;
use iec62056_rs::error::Iec62056Error;
use iec62056_rs::iec::message::DataSet;
use iec62056_rs::payload::profile::{arrange, decode_profile_date, ProfileLayout, ProfileValues};
use iec62056_rs::to_json;

fn data_sets(values: &[&str]) -> Vec<DataSet> {
    values.iter().map(|v| DataSet::new(*v)).collect()
}

fn makel_row(stamp: &str) -> Vec<&str> {
    let mut row = vec![stamp];
    row.extend(["0.1", "0.2", "0.3", "0.4", "0.5", "0.6", "0.7", "0.8"]);
    row
}

#[test]
fn test_every_full_chunk_is_emitted() {
    let mut values = vec!["header"];
    values.extend(makel_row("2101050800"));
    values.extend(makel_row("2101050815"));
    values.extend(makel_row("2101050830"));

    let records = arrange("MSY", &data_sets(&values)).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].date, decode_profile_date("2101050830").unwrap());
}

#[test]
fn test_trailing_partial_chunk_is_ignored() {
    let mut values = vec!["header"];
    values.extend(makel_row("2101050800"));
    values.extend(["2101050815", "0.1", "0.2"]);

    let records = arrange("MSY", &data_sets(&values)).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_header_only_yields_nothing() {
    assert!(arrange("LUN", &data_sets(&["header"])).unwrap().is_empty());
    assert!(arrange("MSY", &[]).unwrap().is_empty());
}

#[test]
fn test_bad_date_in_row_is_reported() {
    let mut values = vec!["header"];
    values.extend(makel_row("21013108"));

    assert!(matches!(
        arrange("MSY", &data_sets(&values)),
        Err(Iec62056Error::InvalidDate(date)) if date == "21013108"
    ));
}

#[test]
fn test_impossible_dates() {
    for bad in ["2102300800", "2101052400", "2101050860", "", "abcdefghij"] {
        assert!(decode_profile_date(bad).is_err(), "{bad} accepted");
    }
}

#[test]
fn test_layout_lookup_is_case_sensitive() {
    assert_eq!(ProfileLayout::for_manufacturer("LUN").unwrap(), ProfileLayout::Luna);
    assert_eq!(ProfileLayout::for_manufacturer("MSY").unwrap().chunk_size(), 9);
    assert!(matches!(
        ProfileLayout::for_manufacturer("msy"),
        Err(Iec62056Error::UnsupportedManufacturer(_))
    ));
}

#[test]
fn test_single_digit_years_are_padded() {
    let start = NaiveDate::from_ymd_opt(2005, 3, 1).unwrap();
    let request = ProfileLayout::Makel.request(start, start);
    let data_set = request.data_set.unwrap();
    assert_eq!(data_set.value, "0503010000;0503010000");
    assert_eq!(data_set.address.as_deref(), Some("P.01"));
    assert_eq!(data_set.end, None);

    let luna = ProfileLayout::Luna.request(start, start).data_set.unwrap();
    assert_eq!(luna.value, "050301;050301");
    assert_eq!(luna.end, None);
}

#[test]
fn test_records_serialize_to_json() {
    let mut values = vec!["header", "2021-01-05", "08:15", "42.5*kWh"];
    values.extend(["0"; 11]);
    let records = arrange("LUN", &data_sets(&values)).unwrap();
    assert_eq!(
        records[0].values,
        ProfileValues::Luna {
            f180: "42.5".to_string()
        }
    );

    let json = to_json(&records).unwrap();
    assert!(json.contains("\"f180\": \"42.5\""));
    assert!(json.contains("2021-01-05T08:15:00"));
}
