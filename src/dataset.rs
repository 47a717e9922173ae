use std::fs;
use std::io;
use std::path::Path;

use log::{info, trace};

use flate2;

use super::error::{Result, SchemaMismatch};
use super::fips::Fips;
use super::progress::{CountMeter, ProgressSink};
use super::schema::{parse_date, parse_error, TypeMap};
use super::table::{LongRow, LongTable};


/// Open a file, decompressing it on the fly if it ends in `.gz`.
pub fn open_data<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn io::Read>> {
	let path = path.as_ref();
	trace!("opening {}", path.display());
	let f = io::BufReader::new(fs::File::open(path)?);
	match path.extension() {
		Some(x) if x == "gz" => Ok(Box::new(flate2::read::GzDecoder::new(f))),
		_ => Ok(Box::new(f)),
	}
}

pub fn load_types<P: AsRef<Path>>(path: P) -> Result<TypeMap> {
	let types = TypeMap::from_reader(open_data(path)?)?;
	trace!("loaded {} column types", types.len());
	Ok(types)
}


fn key_column(header: &csv::StringRecord, name: &str, role: &'static str) -> Result<usize> {
	match header.iter().position(|h| h == name) {
		Some(i) => Ok(i),
		None => Err(SchemaMismatch::UnusableColumn{
			column: name.into(),
			reason: role,
		}.into()),
	}
}

/// Parse a long-format CSV with explicit column types.
///
/// The date column is read as text regardless of its declared type and then
/// parsed on its own; the location column is parsed into a [`Fips`].
pub fn read_long_table<R: io::Read, S: ProgressSink + ?Sized>(
		s: &mut S,
		r: R,
		types: &TypeMap,
		location_column: &str,
		date_column: &str,
) -> Result<LongTable> {
	let mut types = types.clone();
	types.override_text(date_column);

	let mut r = csv::Reader::from_reader(r);
	let header = r.headers()?.clone();
	let columns = types.resolve(header.iter())?;
	let li = key_column(&header, location_column, "is required as location key")?;
	let di = key_column(&header, date_column, "is required as date key")?;

	let value_columns: Vec<(usize, _)> = columns.iter().enumerate()
		.filter(|(i, _)| *i != li && *i != di)
		.map(|(i, c)| (i, c.clone()))
		.collect();
	let mut table = LongTable::new(
		location_column,
		date_column,
		value_columns.iter().map(|(_, c)| c.clone()).collect(),
	);

	let mut pm = CountMeter::new(s, 100_000);
	let mut record = csv::StringRecord::new();
	while r.read_record(&mut record)? {
		let line = record.position().map(|p| p.line()).unwrap_or(0);
		let raw_location = &record[li];
		let location = raw_location.parse::<Fips>()
			.map_err(|_| parse_error(location_column, line, raw_location))?;
		let raw_date = &record[di];
		let date = match parse_date(raw_date) {
			Some(d) => d,
			None => return Err(parse_error(date_column, line, raw_date)),
		};
		let mut values = Vec::with_capacity(value_columns.len());
		for (i, column) in value_columns.iter() {
			let raw = &record[*i];
			match column.kind.parse(raw) {
				Some(v) => values.push(v),
				None => return Err(parse_error(&column.name, line, raw)),
			}
		}
		table.push(LongRow{location, date, values});
		pm.tick();
	}
	let n = pm.finish();
	info!("read {} rows with {} columns", n, columns.len());
	Ok(table)
}

pub fn load_long_table<P: AsRef<Path>, S: ProgressSink + ?Sized>(
		s: &mut S,
		path: P,
		types: &TypeMap,
		location_column: &str,
		date_column: &str,
) -> Result<LongTable> {
	let r = open_data(path)?;
	read_long_table(s, r, types, location_column, date_column)
}
