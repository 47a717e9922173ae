use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use chrono::NaiveDate;

use super::error::{Error, Result, SchemaMismatch};
use super::fips::Fips;
use super::schema::ColumnType;
use super::table::{Attribute, LongTable, Measurement, Observed, Series, Value, WideTable, FSeries, FlagSeries};
use super::timeseries::DateAxis;


enum Target {
	Attribute(usize),
	Measurement(usize),
}


#[derive(Default)]
struct AttributeState {
	// per row: date of the chosen value and the value itself
	chosen: Vec<Option<(NaiveDate, Value)>>,
	varying: HashSet<usize>,
}

impl AttributeState {
	fn submit(&mut self, row: usize, date: NaiveDate, value: &Value) {
		if self.chosen.len() <= row {
			self.chosen.resize(row + 1, None);
		}
		if value.is_missing() {
			return
		}
		let replace = match &self.chosen[row] {
			Some((prev_date, prev)) => {
				if prev != value {
					self.varying.insert(row);
				}
				date > *prev_date
			},
			None => true,
		};
		if replace {
			self.chosen[row] = Some((date, value.clone()));
		}
	}

	fn finish(mut self, nrows: usize) -> Vec<Value> {
		self.chosen.resize(nrows, None);
		self.chosen.into_iter().map(|v| match v {
			Some((_, v)) => v,
			None => Value::Missing,
		}).collect()
	}
}


/// Reshape a table keyed by (location, date) into one row per location, where
/// each of `measurements` becomes a series over the shared date axis.
///
/// All remaining columns are carried over as per-location attributes. Should
/// such a column vary over time for a location, the non-missing value with
/// the latest date is kept.
///
/// Locations appear in the order of their first row in `long`.
pub fn collapse(long: &LongTable, measurements: &[&str]) -> Result<WideTable> {
	let columns = long.columns();
	let mut names = HashSet::new();
	for column in columns {
		if !names.insert(column.name.as_str()) {
			return Err(SchemaMismatch::DuplicateColumn(column.name.clone()).into())
		}
	}
	let mut targets: Vec<Option<Target>> = columns.iter().map(|_| None).collect();
	for (mi, name) in measurements.iter().enumerate() {
		let ci = match long.column_index(name) {
			Some(ci) => ci,
			None => return Err(SchemaMismatch::UnusableColumn{
				column: (*name).into(),
				reason: "is not a column of the table",
			}.into()),
		};
		if targets[ci].is_some() {
			return Err(SchemaMismatch::DuplicateColumn((*name).into()).into())
		}
		let kind = columns[ci].kind;
		if !kind.is_numeric() && kind != ColumnType::Flag {
			return Err(SchemaMismatch::UnusableColumn{
				column: (*name).into(),
				reason: "is neither numeric nor a flag",
			}.into())
		}
		targets[ci] = Some(Target::Measurement(mi));
	}
	let mut nattrs = 0;
	for target in targets.iter_mut() {
		if target.is_none() {
			*target = Some(Target::Attribute(nattrs));
			nattrs += 1;
		}
	}
	let targets: Vec<Target> = targets.into_iter().flatten().collect();

	let axis = Arc::new(DateAxis::from_dates(long.rows().iter().map(|r| r.date)));
	let mut observed = Observed::<Fips>::new(axis.clone());
	let mut series: Vec<Series> = measurements.iter().map(|name| {
		// resolved above
		let ci = long.column_index(name).unwrap_or(0);
		match columns[ci].kind {
			ColumnType::Flag => Series::Flag(FlagSeries::new(axis.clone())),
			_ => Series::Numeric(FSeries::new(axis.clone())),
		}
	}).collect();
	let mut attrs: Vec<AttributeState> = (0..nattrs).map(|_| AttributeState::default()).collect();

	for rec in long.rows() {
		let i = match axis.position(rec.date) {
			Some(i) => i,
			None => unreachable!("axis built from these rows"),
		};
		let row = observed.get_index_or_create(rec.location);
		let mask = observed.get_or_create(rec.location);
		if mask[i] {
			return Err(Error::DuplicateKey{location: rec.location, date: rec.date})
		}
		mask[i] = true;

		for (target, value) in targets.iter().zip(rec.values.iter()) {
			match target {
				Target::Attribute(ai) => attrs[*ai].submit(row, rec.date, value),
				Target::Measurement(mi) => match &mut series[*mi] {
					Series::Numeric(ts) => {
						ts.get_or_create(rec.location)[i] = value.as_f64().unwrap_or(f64::NAN);
					},
					Series::Flag(ts) => {
						ts.get_or_create(rec.location)[i] = value.as_flag();
					},
				},
			}
		}
	}

	let nrows = observed.num_keys();
	debug!(
		"collapsed {} rows into {} locations over {} dates ({} measurements, {} attributes)",
		long.len(), nrows, axis.len(), measurements.len(), nattrs,
	);

	let mut attributes = Vec::with_capacity(nattrs);
	let mut measurement_cols = Vec::with_capacity(measurements.len());
	let mut attr_states = attrs.into_iter();
	for (column, target) in columns.iter().zip(targets.iter()) {
		match target {
			Target::Attribute(_) => {
				let state = match attr_states.next() {
					Some(s) => s,
					None => unreachable!("one state per attribute"),
				};
				if !state.varying.is_empty() {
					warn!(
						"column {:?} varies over time for {} locations, keeping the most recent value",
						column.name, state.varying.len(),
					);
				}
				attributes.push(Attribute{
					column: column.clone(),
					values: state.finish(nrows),
				});
			},
			Target::Measurement(mi) => measurement_cols.push((*mi, column.clone())),
		}
	}
	// keep the caller's measurement order
	measurement_cols.sort_by_key(|(mi, _)| *mi);
	let mut series: Vec<Option<Series>> = series.into_iter().map(Some).collect();
	let measurements = measurement_cols.into_iter().filter_map(|(mi, column)| {
		Some(Measurement{
			column,
			series: series[mi].take()?,
		})
	}).collect();

	Ok(WideTable::from_parts(
		long.location_column().into(),
		long.date_column().into(),
		columns.to_vec(),
		observed,
		attributes,
		measurements,
	))
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::schema::Column;
	use crate::table::LongRow;

	fn day(d: u32) -> NaiveDate {
		NaiveDate::from_ymd(2021, 1, d)
	}

	fn fips(s: &str) -> Fips {
		s.parse().unwrap()
	}

	fn table() -> LongTable {
		LongTable::new("FIPS", "Date", vec![
			Column::new("Region", ColumnType::Text),
			Column::new("Population", ColumnType::Float),
			Column::new("Confirmed", ColumnType::Int),
			Column::new("Confirmed_Outlier", ColumnType::Flag),
		])
	}

	fn row(loc: &str, d: u32, pop: f64, confirmed: i64, outlier: bool) -> LongRow {
		LongRow{
			location: fips(loc),
			date: day(d),
			values: vec![
				Value::Text("Alabama".into()),
				Value::Float(pop),
				Value::Int(confirmed),
				Value::Flag(outlier),
			],
		}
	}

	fn sample() -> LongTable {
		let mut t = table();
		t.push(row("01003", 2, 200.0, 7, false));
		t.push(row("01001", 1, 100.0, 1, false));
		t.push(row("01001", 3, 100.0, 5, true));
		t.push(row("01003", 1, 200.0, 4, false));
		t
	}

	#[test]
	fn builds_shared_sorted_axis() {
		let wide = collapse(&sample(), &["Confirmed", "Confirmed_Outlier"]).unwrap();
		assert_eq!(wide.axis().dates(), &[day(1), day(2), day(3)]);
		assert_eq!(wide.len(), 2);
		for m in wide.measurements() {
			match &m.series {
				Series::Numeric(ts) => for (_, row) in ts.iter() { assert_eq!(row.len(), 3) },
				Series::Flag(ts) => for (_, row) in ts.iter() { assert_eq!(row.len(), 3) },
			}
		}
	}

	#[test]
	fn fills_gaps_and_keeps_first_appearance_order() {
		let wide = collapse(&sample(), &["Confirmed", "Confirmed_Outlier"]).unwrap();
		assert_eq!(wide.locations().copied().collect::<Vec<_>>(), vec![fips("01003"), fips("01001")]);

		let confirmed = wide.numeric("Confirmed").unwrap();
		let a = confirmed.get(&fips("01001")).unwrap();
		assert_eq!(a[0], 1.0);
		assert!(a[1].is_nan());
		assert_eq!(a[2], 5.0);
		let b = confirmed.get(&fips("01003")).unwrap();
		assert_eq!(&b[..2], &[4.0, 7.0]);
		assert!(b[2].is_nan());

		let flags = wide.measurement("Confirmed_Outlier").unwrap().series.as_flag().unwrap();
		assert_eq!(flags.get(&fips("01001")).unwrap(), &[Some(false), None, Some(true)]);
	}

	#[test]
	fn carries_attributes() {
		let wide = collapse(&sample(), &["Confirmed"]).unwrap();
		assert_eq!(wide.attribute_value(&fips("01003"), "Population"), Some(&Value::Float(200.0)));
		assert_eq!(wide.attribute_value(&fips("01001"), "Region"), Some(&Value::Text("Alabama".into())));
		// flags not requested as measurement are attributes
		assert!(wide.attribute("Confirmed_Outlier").is_some());
	}

	#[test]
	fn varying_attribute_keeps_most_recent_value() {
		let mut t = table();
		t.push(row("01001", 2, 120.0, 1, false));
		t.push(row("01001", 3, 130.0, 2, false));
		t.push(row("01001", 1, 110.0, 3, false));
		let mut missing = row("01001", 4, 0.0, 4, false);
		missing.values[1] = Value::Missing;
		t.push(missing);
		let wide = collapse(&t, &["Confirmed"]).unwrap();
		assert_eq!(wide.attribute_value(&fips("01001"), "Population"), Some(&Value::Float(130.0)));
	}

	#[test]
	fn rejects_duplicate_keys() {
		let mut t = sample();
		t.push(row("01001", 3, 100.0, 6, false));
		match collapse(&t, &["Confirmed"]) {
			Err(Error::DuplicateKey{location, date}) => {
				assert_eq!(location, fips("01001"));
				assert_eq!(date, day(3));
			},
			other => panic!("unexpected result: {:?}", other.map(|w| w.len())),
		}
	}

	#[test]
	fn rejects_unusable_measurements() {
		match collapse(&sample(), &["Deaths"]) {
			Err(Error::SchemaMismatch(SchemaMismatch::UnusableColumn{column, ..})) => assert_eq!(column.as_str(), "Deaths"),
			other => panic!("unexpected result: {:?}", other.map(|w| w.len())),
		}
		match collapse(&sample(), &["Region"]) {
			Err(Error::SchemaMismatch(SchemaMismatch::UnusableColumn{column, ..})) => assert_eq!(column.as_str(), "Region"),
			other => panic!("unexpected result: {:?}", other.map(|w| w.len())),
		}
		match collapse(&sample(), &["Confirmed", "Confirmed"]) {
			Err(Error::SchemaMismatch(SchemaMismatch::DuplicateColumn(column))) => assert_eq!(column.as_str(), "Confirmed"),
			other => panic!("unexpected result: {:?}", other.map(|w| w.len())),
		}
	}

	#[test]
	fn rejects_duplicate_column_names() {
		let mut t = LongTable::new("FIPS", "Date", vec![
			Column::new("Confirmed", ColumnType::Float),
			Column::new("Confirmed", ColumnType::Float),
		]);
		t.push(LongRow{
			location: fips("01001"),
			date: day(1),
			values: vec![Value::Float(1.0), Value::Float(2.0)],
		});
		match collapse(&t, &["Confirmed"]) {
			Err(Error::SchemaMismatch(SchemaMismatch::DuplicateColumn(column))) => assert_eq!(column.as_str(), "Confirmed"),
			other => panic!("unexpected result: {:?}", other.map(|w| w.len())),
		}
	}

	#[test]
	fn expand_restores_observed_rows() {
		let long = sample();
		let wide = collapse(&long, &["Confirmed", "Confirmed_Outlier"]).unwrap();
		let back = wide.expand();
		assert_eq!(back.columns(), long.columns());

		let mut expected = long.rows().to_vec();
		let mut actual = back.rows().to_vec();
		expected.sort_by_key(|r| (r.location, r.date));
		actual.sort_by_key(|r| (r.location, r.date));
		assert_eq!(actual, expected);
		assert!(!wide.observed(&fips("01001"), day(2)));
		assert!(wide.observed(&fips("01001"), day(3)));
	}

	#[test]
	fn empty_table_collapses_to_empty_axis() {
		let wide = collapse(&table(), &["Confirmed"]).unwrap();
		assert!(wide.is_empty());
		assert!(wide.axis().is_empty());
	}
}
