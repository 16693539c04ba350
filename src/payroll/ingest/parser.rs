use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One schedule row after syntactic validation.
#[derive(Debug)]
pub(crate) struct ParsedRow {
    pub(crate) row: u64,
    pub(crate) instructor_raw: String,
    pub(crate) discipline_raw: String,
    pub(crate) date: NaiveDate,
    pub(crate) starts_at: NaiveTime,
    pub(crate) venue: String,
    pub(crate) city: String,
    pub(crate) country: String,
    pub(crate) reservations_total: u32,
    pub(crate) waitlist: u32,
    pub(crate) courtesy_seats: u32,
    pub(crate) capacity: u32,
    pub(crate) paid_reservations: u32,
}

/// Parse outcome per data row; malformed rows are reported, not fatal.
#[derive(Debug)]
pub(crate) enum RowOutcome {
    Parsed(ParsedRow),
    Invalid { row: u64, message: String },
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Vec<RowOutcome> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut outcomes = Vec::new();
    for (index, record) in csv_reader.deserialize::<ScheduleRow>().enumerate() {
        let row = index as u64 + 1;
        match record {
            Ok(raw) => outcomes.push(match raw.into_parsed(row) {
                Ok(parsed) => RowOutcome::Parsed(parsed),
                Err(message) => RowOutcome::Invalid { row, message },
            }),
            Err(err) => outcomes.push(RowOutcome::Invalid {
                row,
                message: format!("unreadable row: {err}"),
            }),
        }
    }
    outcomes
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    #[serde(rename = "Instructor")]
    instructor: String,
    #[serde(rename = "Discipline")]
    discipline: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Venue")]
    venue: String,
    #[serde(rename = "City", default)]
    city: String,
    #[serde(rename = "Country", default)]
    country: String,
    #[serde(rename = "Reservations", default, deserialize_with = "empty_string_as_none")]
    reservations: Option<String>,
    #[serde(rename = "Waitlist", default, deserialize_with = "empty_string_as_none")]
    waitlist: Option<String>,
    #[serde(rename = "Courtesy Seats", default, deserialize_with = "empty_string_as_none")]
    courtesy_seats: Option<String>,
    #[serde(rename = "Capacity", default, deserialize_with = "empty_string_as_none")]
    capacity: Option<String>,
    #[serde(rename = "Paid Reservations", default, deserialize_with = "empty_string_as_none")]
    paid_reservations: Option<String>,
}

impl ScheduleRow {
    fn into_parsed(self, row: u64) -> Result<ParsedRow, String> {
        let date = parse_date(&self.date).ok_or_else(|| format!("invalid date '{}'", self.date))?;
        let starts_at =
            parse_time(&self.time).ok_or_else(|| format!("invalid time '{}'", self.time))?;

        if self.instructor.trim().is_empty() {
            return Err("missing instructor name".to_string());
        }
        if self.discipline.trim().is_empty() {
            return Err("missing discipline".to_string());
        }

        Ok(ParsedRow {
            row,
            instructor_raw: self.instructor,
            discipline_raw: self.discipline,
            date,
            starts_at,
            venue: self.venue,
            city: self.city,
            country: self.country,
            reservations_total: parse_count("Reservations", self.reservations.as_deref())?,
            waitlist: parse_count("Waitlist", self.waitlist.as_deref())?,
            courtesy_seats: parse_count("Courtesy Seats", self.courtesy_seats.as_deref())?,
            capacity: parse_count("Capacity", self.capacity.as_deref())?,
            paid_reservations: parse_count("Paid Reservations", self.paid_reservations.as_deref())?,
        })
    }
}

fn parse_count(field: &str, value: Option<&str>) -> Result<u32, String> {
    match value {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("{field} must be a whole number, got '{raw}'")),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
pub(crate) fn parse_date_for_tests(value: &str) -> Option<NaiveDate> {
    parse_date(value)
}

#[cfg(test)]
pub(crate) fn parse_time_for_tests(value: &str) -> Option<NaiveTime> {
    parse_time(value)
}
