use log::debug;

use smartstring::alias::{String as SmartString};

use super::error::{Error, Result, SchemaMismatch};
use super::fips::Fips;
use super::table::{FSeries, SnapshotRow, SnapshotTable, WideTable};


pub const PER_CAPITA_SCALE: f64 = 100.0;
pub const PER_CAPITA_SUFFIX: &str = "_per_100";

/// Axis positions between the latest value and the value it is compared to
/// for the trailing-week delta. The axis must be daily across that window.
pub const WEEK_OFFSET: usize = 7;


/// Names of the per-location attributes copied into every snapshot.
#[derive(Debug, Clone)]
pub struct AttributeNames {
	pub region: SmartString,
	pub subregion: SmartString,
	pub population: SmartString,
}

impl Default for AttributeNames {
	fn default() -> Self {
		Self{
			region: "Region".into(),
			subregion: "SubRegion".into(),
			population: "Population".into(),
		}
	}
}


pub fn per_capita_name(column: &str) -> SmartString {
	let mut name = SmartString::from(column);
	name.push_str(PER_CAPITA_SUFFIX);
	name
}

/// `100 * value / population`, element-wise. Zero or missing population yields
/// NaN rather than infinity.
pub fn per_capita(table: &WideTable, column: &str, population: &str) -> Result<FSeries<Fips>> {
	let series = numeric(table, column)?;
	let population = match table.attribute(population) {
		Some(attr) if attr.column.kind.is_numeric() => attr,
		Some(_) => return Err(SchemaMismatch::UnusableColumn{
			column: population.into(),
			reason: "is not numeric",
		}.into()),
		None => return Err(SchemaMismatch::UnusableColumn{
			column: population.into(),
			reason: "is not a per-location attribute",
		}.into()),
	};
	Ok(series.map_rows(|k, src, dst| {
		let pop = table.row_index(k)
			.and_then(|row| population.values.get(row))
			.and_then(|v| v.as_f64())
			.unwrap_or(f64::NAN);
		for (d, s) in dst.iter_mut().zip(src.iter()) {
			*d = if pop == 0.0 || pop.is_nan() {
				f64::NAN
			} else {
				PER_CAPITA_SCALE * *s / pop
			};
		}
	}))
}

/// Append a `<column>_per_100` measurement for each of `columns`. Returns the
/// names of the new columns.
pub fn add_per_capita(table: &mut WideTable, columns: &[&str], population: &str) -> Result<Vec<SmartString>> {
	let mut names = Vec::with_capacity(columns.len());
	for column in columns {
		let series = per_capita(table, column, population)?;
		let name = per_capita_name(column);
		table.add_numeric(name.clone(), series)?;
		names.push(name);
	}
	Ok(names)
}


fn numeric<'t>(table: &'t WideTable, column: &str) -> Result<&'t FSeries<Fips>> {
	match table.numeric(column) {
		Some(ts) => Ok(ts),
		None => Err(SchemaMismatch::UnusableColumn{
			column: column.into(),
			reason: "is not a numeric measurement",
		}.into()),
	}
}

fn snapshot(table: &WideTable, columns: &[&str], series: &[&FSeries<Fips>], names: &AttributeNames) -> Result<SnapshotTable> {
	let date = match table.axis().last() {
		Some(d) => d,
		None => return Err(Error::InsufficientHistory{required: 1, available: 0}),
	};
	let mut result = SnapshotTable::new(date, columns.iter().map(|c| (*c).into()).collect());
	for location in table.locations() {
		let text = |name: &str| {
			table.attribute_value(location, name)
				.and_then(|v| v.as_text())
				.map(SmartString::from)
		};
		let population = table.attribute_value(location, &names.population)
			.and_then(|v| v.as_f64())
			.unwrap_or(f64::NAN);
		result.push(SnapshotRow{
			location: *location,
			region: text(&names.region),
			subregion: text(&names.subregion),
			population,
			values: series.iter().map(|ts| ts.last_value(location).unwrap_or(f64::NAN)).collect(),
		});
	}
	Ok(result)
}

/// Value at the last axis position, per location and column.
pub fn latest(table: &WideTable, columns: &[&str], names: &AttributeNames) -> Result<SnapshotTable> {
	let series = columns.iter().map(|c| numeric(table, c)).collect::<Result<Vec<_>>>()?;
	let result = snapshot(table, columns, &series[..], names)?;
	debug!("latest snapshot at {} with {} rows", result.date(), result.len());
	Ok(result)
}

/// Latest value minus the value [`WEEK_OFFSET`] positions earlier, per
/// location and column.
pub fn this_week(table: &WideTable, columns: &[&str], names: &AttributeNames) -> Result<SnapshotTable> {
	let axis = table.axis();
	if axis.len() < WEEK_OFFSET + 1 {
		return Err(Error::InsufficientHistory{required: WEEK_OFFSET + 1, available: axis.len()})
	}
	let last = axis.len() - 1;
	let first = last - WEEK_OFFSET;
	if !axis.is_daily(first, last) {
		// both positions exist, checked above
		let (from, to) = match (axis.get(first), axis.get(last)) {
			(Some(from), Some(to)) => (from, to),
			_ => unreachable!(),
		};
		return Err(Error::IrregularDateAxis{from, to, steps: WEEK_OFFSET})
	}

	let mut diffed = Vec::with_capacity(columns.len());
	for column in columns {
		let mut ts = numeric(table, column)?.clone();
		ts.diff(WEEK_OFFSET);
		diffed.push(ts);
	}
	let series: Vec<&FSeries<Fips>> = diffed.iter().collect();
	let result = snapshot(table, columns, &series[..], names)?;
	debug!("weekly snapshot ending {} with {} rows", result.date(), result.len());
	Ok(result)
}
