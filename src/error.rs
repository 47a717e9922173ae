use std::fmt;
use std::io;

use chrono::NaiveDate;

use smartstring::alias::{String as SmartString};

use super::fips::Fips;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
	/// Column present in the CSV header but absent from the type metadata.
	UntypedColumn(SmartString),
	/// Column described by the type metadata but absent from the CSV header.
	MissingColumn(SmartString),
	UnknownTypeTag{column: SmartString, tag: SmartString},
	DuplicateColumn(SmartString),
	/// A column was requested (as key, measurement or population) which the
	/// table does not have, or which has an unusable type for that role.
	UnusableColumn{column: SmartString, reason: &'static str},
}

impl fmt::Display for SchemaMismatch {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::UntypedColumn(c) => write!(f, "column {:?} has no type in the metadata", c),
			Self::MissingColumn(c) => write!(f, "column {:?} is typed in the metadata but missing from the data", c),
			Self::UnknownTypeTag{column, tag} => write!(f, "unknown type tag {:?} for column {:?}", tag, column),
			Self::DuplicateColumn(c) => write!(f, "column {:?} appears more than once", c),
			Self::UnusableColumn{column, reason} => write!(f, "column {:?} {}", column, reason),
		}
	}
}


#[derive(Debug)]
pub enum FetchError {
	Request(reqwest::Error),
	Status(reqwest::StatusCode),
	Malformed(String),
}

impl fmt::Display for FetchError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Request(e) => fmt::Display::fmt(e, f),
			Self::Status(s) => write!(f, "unexpected status {}", s),
			Self::Malformed(msg) => write!(f, "malformed boundary data: {}", msg),
		}
	}
}


#[derive(Debug)]
pub enum Error {
	Io(io::Error),
	Csv(csv::Error),
	Json(serde_json::Error),
	SchemaMismatch(SchemaMismatch),
	Parse{column: SmartString, line: u64, value: String},
	DuplicateKey{location: Fips, date: NaiveDate},
	InsufficientHistory{required: usize, available: usize},
	IrregularDateAxis{from: NaiveDate, to: NaiveDate, steps: usize},
	NetworkFetch(FetchError),
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Io(e) => fmt::Display::fmt(e, f),
			Self::Csv(e) => fmt::Display::fmt(e, f),
			Self::Json(e) => fmt::Display::fmt(e, f),
			Self::SchemaMismatch(e) => write!(f, "schema mismatch: {}", e),
			Self::Parse{column, line, value} => write!(f, "invalid value {:?} in column {:?} on line {}", value, column, line),
			Self::DuplicateKey{location, date} => write!(f, "duplicate row for location {} on {}", location, date),
			Self::InsufficientHistory{required, available} => write!(f, "need at least {} dates, have {}", required, available),
			Self::IrregularDateAxis{from, to, steps} => write!(f, "{} steps from {} to {} are not daily", steps, from, to),
			Self::NetworkFetch(e) => write!(f, "failed to fetch boundaries: {}", e),
		}
	}
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
	fn from(other: io::Error) -> Self {
		Self::Io(other)
	}
}

impl From<csv::Error> for Error {
	fn from(other: csv::Error) -> Self {
		Self::Csv(other)
	}
}

impl From<serde_json::Error> for Error {
	fn from(other: serde_json::Error) -> Self {
		Self::Json(other)
	}
}

impl From<SchemaMismatch> for Error {
	fn from(other: SchemaMismatch) -> Self {
		Self::SchemaMismatch(other)
	}
}

impl From<FetchError> for Error {
	fn from(other: FetchError) -> Self {
		Self::NetworkFetch(other)
	}
}

impl From<reqwest::Error> for Error {
	fn from(other: reqwest::Error) -> Self {
		Self::NetworkFetch(FetchError::Request(other))
	}
}

pub type Result<T> = std::result::Result<T, Error>;
