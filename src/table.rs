use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use chrono::NaiveDate;

use smartstring::alias::{String as SmartString};

use super::error::{Result, SchemaMismatch};
use super::fips::Fips;
use super::schema::{Column, ColumnType};
use super::timeseries::{DateAxis, TimeSeries};


pub type FSeries<K> = TimeSeries<K, f64>;
pub type FlagSeries<K> = TimeSeries<K, Option<bool>>;
pub type Observed<K> = TimeSeries<K, bool>;


/// A single typed cell. `Float` never holds NaN: missing numbers are `Missing`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Missing,
	Float(f64),
	Int(i64),
	Flag(bool),
	Text(SmartString),
	Date(NaiveDate),
}

impl Value {
	pub fn is_missing(&self) -> bool {
		match self {
			Self::Missing => true,
			_ => false,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Float(v) => Some(*v),
			Self::Int(v) => Some(*v as f64),
			_ => None,
		}
	}

	pub fn as_flag(&self) -> Option<bool> {
		match self {
			Self::Flag(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(v) => Some(v.as_str()),
			_ => None,
		}
	}

	fn from_f64(kind: ColumnType, v: f64) -> Self {
		if v.is_nan() {
			return Self::Missing
		}
		match kind {
			ColumnType::Int => Self::Int(v as i64),
			_ => Self::Float(v),
		}
	}
}

impl fmt::Display for Value {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Missing => Ok(()),
			Self::Float(v) => write!(f, "{}", v),
			Self::Int(v) => write!(f, "{}", v),
			Self::Flag(true) => f.write_str("True"),
			Self::Flag(false) => f.write_str("False"),
			Self::Text(v) => f.write_str(v),
			Self::Date(v) => write!(f, "{}", v),
		}
	}
}


#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
	pub location: Fips,
	pub date: NaiveDate,
	/// Aligned with [`LongTable::columns`].
	pub values: Vec<Value>,
}


/// One row per (location, date). The two key columns are held apart from the
/// remaining columns.
#[derive(Debug, Clone)]
pub struct LongTable {
	location_column: SmartString,
	date_column: SmartString,
	columns: Vec<Column>,
	rows: Vec<LongRow>,
}

impl LongTable {
	pub fn new<S: Into<SmartString>>(location_column: S, date_column: S, columns: Vec<Column>) -> Self {
		Self{
			location_column: location_column.into(),
			date_column: date_column.into(),
			columns,
			rows: Vec::new(),
		}
	}

	pub fn push(&mut self, row: LongRow) {
		assert_eq!(row.values.len(), self.columns.len());
		self.rows.push(row);
	}

	pub fn location_column(&self) -> &str {
		&self.location_column
	}

	pub fn date_column(&self) -> &str {
		&self.date_column
	}

	pub fn columns(&self) -> &[Column] {
		&self.columns[..]
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|c| c.name.as_str() == name)
	}

	pub fn rows(&self) -> &[LongRow] {
		&self.rows[..]
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}


#[derive(Debug, Clone)]
pub enum Series {
	Numeric(FSeries<Fips>),
	Flag(FlagSeries<Fips>),
}

impl Series {
	pub fn as_numeric(&self) -> Option<&FSeries<Fips>> {
		match self {
			Self::Numeric(ts) => Some(ts),
			_ => None,
		}
	}

	pub fn as_flag(&self) -> Option<&FlagSeries<Fips>> {
		match self {
			Self::Flag(ts) => Some(ts),
			_ => None,
		}
	}

	pub fn axis(&self) -> &Arc<DateAxis> {
		match self {
			Self::Numeric(ts) => ts.axis(),
			Self::Flag(ts) => ts.axis(),
		}
	}

	pub fn num_keys(&self) -> usize {
		match self {
			Self::Numeric(ts) => ts.num_keys(),
			Self::Flag(ts) => ts.num_keys(),
		}
	}

	fn value(&self, kind: ColumnType, k: &Fips, i: usize) -> Value {
		match self {
			Self::Numeric(ts) => match ts.get_value(k, i) {
				Some(v) => Value::from_f64(kind, v),
				None => Value::Missing,
			},
			Self::Flag(ts) => match ts.get_value(k, i) {
				Some(Some(v)) => Value::Flag(v),
				_ => Value::Missing,
			},
		}
	}
}


#[derive(Debug, Clone)]
pub struct Measurement {
	pub column: Column,
	pub series: Series,
}


/// Per-location value of a column which does not vary over time.
#[derive(Debug, Clone)]
pub struct Attribute {
	pub column: Column,
	/// Aligned with the row order of the owning [`WideTable`].
	pub values: Vec<Value>,
}


/// One row per location. Every measurement holds a series of exactly
/// `axis().len()` values per location.
#[derive(Debug, Clone)]
pub struct WideTable {
	location_column: SmartString,
	date_column: SmartString,
	// source column order, for expansion
	columns: Vec<Column>,
	observed: Observed<Fips>,
	attributes: Vec<Attribute>,
	measurements: Vec<Measurement>,
}

impl WideTable {
	pub(crate) fn from_parts(
			location_column: SmartString,
			date_column: SmartString,
			columns: Vec<Column>,
			observed: Observed<Fips>,
			attributes: Vec<Attribute>,
			measurements: Vec<Measurement>,
	) -> Self {
		for attr in attributes.iter() {
			assert_eq!(attr.values.len(), observed.num_keys());
		}
		for m in measurements.iter() {
			assert!(Arc::ptr_eq(m.series.axis(), observed.axis()));
			assert_eq!(m.series.num_keys(), observed.num_keys());
		}
		Self{
			location_column,
			date_column,
			columns,
			observed,
			attributes,
			measurements,
		}
	}

	pub fn axis(&self) -> &Arc<DateAxis> {
		self.observed.axis()
	}

	pub fn len(&self) -> usize {
		self.observed.num_keys()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn locations(&self) -> std::slice::Iter<'_, Fips> {
		self.observed.keys()
	}

	pub fn row_index(&self, location: &Fips) -> Option<usize> {
		self.observed.get_index(location)
	}

	/// Whether the source table had a row for this location and date.
	pub fn observed(&self, location: &Fips, date: NaiveDate) -> bool {
		match self.observed.date_index(date) {
			Some(i) => self.observed.get_value(location, i).unwrap_or(false),
			None => false,
		}
	}

	pub fn attributes(&self) -> &[Attribute] {
		&self.attributes[..]
	}

	pub fn attribute(&self, name: &str) -> Option<&Attribute> {
		self.attributes.iter().find(|a| a.column.name.as_str() == name)
	}

	pub fn attribute_value(&self, location: &Fips, name: &str) -> Option<&Value> {
		let row = self.row_index(location)?;
		self.attribute(name)?.values.get(row)
	}

	pub fn measurements(&self) -> &[Measurement] {
		&self.measurements[..]
	}

	pub fn measurement(&self, name: &str) -> Option<&Measurement> {
		self.measurements.iter().find(|m| m.column.name.as_str() == name)
	}

	pub fn numeric(&self, name: &str) -> Option<&FSeries<Fips>> {
		self.measurement(name)?.series.as_numeric()
	}

	pub fn has_column(&self, name: &str) -> bool {
		self.columns.iter().any(|c| c.name.as_str() == name)
	}

	/// Append a derived numeric measurement. The series must have been derived
	/// from this table, i.e. share its axis and rows.
	pub fn add_numeric<S: Into<SmartString>>(&mut self, name: S, series: FSeries<Fips>) -> Result<()> {
		let name = name.into();
		if self.has_column(&name) {
			return Err(SchemaMismatch::DuplicateColumn(name).into())
		}
		assert!(Arc::ptr_eq(series.axis(), self.axis()));
		assert_eq!(series.num_keys(), self.len());
		let column = Column::new(name, ColumnType::Float);
		self.columns.push(column.clone());
		self.measurements.push(Measurement{
			column,
			series: Series::Numeric(series),
		});
		Ok(())
	}

	/// Back to one row per observed (location, date). Positions which only
	/// exist as gap filler are dropped.
	pub fn expand(&self) -> LongTable {
		enum Source<'x> {
			Attribute(&'x Attribute),
			Measurement(&'x Measurement),
		}

		let sources: Vec<Source> = self.columns.iter().map(|c| {
			match self.attribute(&c.name) {
				Some(a) => Source::Attribute(a),
				// every column is either an attribute or a measurement
				None => Source::Measurement(self.measurement(&c.name).expect("column without storage")),
			}
		}).collect();

		let mut result = LongTable::new(
			self.location_column.clone(),
			self.date_column.clone(),
			self.columns.clone(),
		);
		for (row, (location, mask)) in self.observed.iter().enumerate() {
			for (i, present) in mask.iter().enumerate() {
				if !*present {
					continue
				}
				let date = match self.axis().get(i) {
					Some(d) => d,
					None => continue,
				};
				let values = sources.iter().map(|s| match s {
					Source::Attribute(a) => a.values[row].clone(),
					Source::Measurement(m) => m.series.value(m.column.kind, location, i),
				}).collect();
				result.push(LongRow{
					location: *location,
					date,
					values,
				});
			}
		}
		result
	}
}


#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
	pub location: Fips,
	pub region: Option<SmartString>,
	pub subregion: Option<SmartString>,
	pub population: f64,
	/// Aligned with [`SnapshotTable::columns`].
	pub values: Vec<f64>,
}


/// Scalar per-location values taken from a [`WideTable`] at one point in time.
#[derive(Debug, Clone)]
pub struct SnapshotTable {
	date: NaiveDate,
	columns: Vec<SmartString>,
	rows: Vec<SnapshotRow>,
	index: HashMap<Fips, usize>,
}

impl SnapshotTable {
	pub fn new(date: NaiveDate, columns: Vec<SmartString>) -> Self {
		Self{
			date,
			columns,
			rows: Vec::new(),
			index: HashMap::new(),
		}
	}

	pub fn push(&mut self, row: SnapshotRow) {
		assert_eq!(row.values.len(), self.columns.len());
		self.index.insert(row.location, self.rows.len());
		self.rows.push(row);
	}

	/// Date of the last axis position the snapshot was taken at.
	pub fn date(&self) -> NaiveDate {
		self.date
	}

	pub fn columns(&self) -> &[SmartString] {
		&self.columns[..]
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|c| c.as_str() == name)
	}

	pub fn rows(&self) -> &[SnapshotRow] {
		&self.rows[..]
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn get(&self, location: &Fips) -> Option<&SnapshotRow> {
		Some(&self.rows[*self.index.get(location)?])
	}

	pub fn value(&self, location: &Fips, column: &str) -> Option<f64> {
		let i = self.column_index(column)?;
		Some(self.get(location)?.values[i])
	}

	pub fn write_csv<W: io::Write>(&self, w: W) -> Result<()> {
		let mut w = csv::Writer::from_writer(w);
		let mut header = vec!["FIPS", "Region", "SubRegion", "Population"];
		header.extend(self.columns.iter().map(|c| c.as_str()));
		w.write_record(&header)?;
		let mut record = Vec::with_capacity(header.len());
		for row in self.rows.iter() {
			record.clear();
			record.push(row.location.to_string());
			record.push(row.region.as_deref().unwrap_or("").to_string());
			record.push(row.subregion.as_deref().unwrap_or("").to_string());
			record.push(fmt_f64(row.population));
			record.extend(row.values.iter().map(|v| fmt_f64(*v)));
			w.write_record(&record)?;
		}
		w.flush()?;
		Ok(())
	}
}

fn fmt_f64(v: f64) -> String {
	if v.is_nan() {
		String::new()
	} else {
		format!("{}", v)
	}
}
