use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use uscovid::{Config, Error, Fips, NullSink, Value};


const META: &str = r#"{
	"FIPS": "object",
	"Date": "datetime64[ns]",
	"Region": "object",
	"SubRegion": "object",
	"Population": "float64",
	"Confirmed": "float64",
	"Deaths": "float64",
	"Confirmed_Outlier": "bool",
	"Deaths_Outlier": "bool"
}"#;

const CONFIRMED: [u32; 10] = [10, 12, 15, 15, 20, 22, 25, 30, 33, 40];


fn write_inputs(dir: &Path, days: usize, extra: &[&str]) {
	fs::write(dir.join("us_counties_clean_meta.json"), META).unwrap();
	let mut f = fs::File::create(dir.join("us_counties_clean.csv")).unwrap();
	writeln!(f, "FIPS,Date,Region,SubRegion,Population,Confirmed,Deaths,Confirmed_Outlier,Deaths_Outlier").unwrap();
	for (i, confirmed) in CONFIRMED.iter().take(days).enumerate() {
		writeln!(f, "1001,2021-01-{:02},Alabama,Autauga,1000.0,{},{},False,False", i + 1, confirmed, i).unwrap();
		writeln!(f, "1003,2021-01-{:02},Alabama,Baldwin,0.0,{},0,False,True", i + 1, confirmed * 2).unwrap();
	}
	for line in extra {
		writeln!(f, "{}", line).unwrap();
	}
}

fn fips(s: &str) -> Fips {
	s.parse().unwrap()
}


#[test]
fn reference_county_end_to_end() {
	let dir = tempfile::tempdir().unwrap();
	write_inputs(dir.path(), 10, &[]);
	let config = Config::with_data_dir(dir.path());

	let (table, snapshots) = uscovid::run(&mut NullSink, &config).unwrap();
	assert_eq!(table.len(), 2);
	assert_eq!(table.axis().len(), 10);
	assert_eq!(table.axis().first(), Some(NaiveDate::from_ymd(2021, 1, 1)));
	assert!(table.measurement("Deaths_Outlier").is_some());
	assert_eq!(
		snapshots.columns.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
		vec!["Confirmed", "Deaths", "Confirmed_per_100", "Deaths_per_100"],
	);

	let autauga = fips("01001");
	assert_eq!(snapshots.latest.value(&autauga, "Confirmed_per_100"), Some(4.0));
	assert_eq!(snapshots.latest.value(&autauga, "Deaths"), Some(9.0));
	assert_eq!(snapshots.this_week.value(&autauga, "Confirmed"), Some(25.0));
	assert_eq!(snapshots.this_week.value(&autauga, "Deaths"), Some(7.0));

	// zero population: raw counts survive, rates do not
	let baldwin = fips("01003");
	assert_eq!(snapshots.latest.value(&baldwin, "Confirmed"), Some(80.0));
	assert!(snapshots.latest.value(&baldwin, "Confirmed_per_100").unwrap().is_nan());
	assert_eq!(snapshots.latest.get(&baldwin).unwrap().subregion.as_deref(), Some("Baldwin"));
}

#[test]
fn collapse_round_trips_through_expand() {
	let dir = tempfile::tempdir().unwrap();
	write_inputs(dir.path(), 9, &["1005,2021-01-04,Alabama,Barbour,500.0,3,1,True,False"]);
	let config = Config::with_data_dir(dir.path());

	let types = uscovid::load_types(config.metadata_path()).unwrap();
	let long = uscovid::load_long_table(&mut NullSink, config.cases_path(), &types, "FIPS", "Date").unwrap();
	let wide = uscovid::load(&mut NullSink, &config).unwrap();

	for m in wide.measurements() {
		if let Some(ts) = m.series.as_numeric() {
			for (_, row) in ts.iter() {
				assert_eq!(row.len(), wide.axis().len());
			}
		}
	}
	let barbour = wide.numeric("Confirmed").unwrap().get(&fips("01005")).unwrap();
	assert_eq!(barbour.iter().filter(|v| !v.is_nan()).count(), 1);

	let back = wide.expand();
	assert_eq!(back.len(), long.len());
	let mut expected = long.rows().to_vec();
	let mut actual = back.rows().to_vec();
	expected.sort_by_key(|r| (r.location, r.date));
	actual.sort_by_key(|r| (r.location, r.date));
	assert_eq!(actual, expected);
	assert_eq!(actual[0].values[0], Value::Text("Alabama".into()));
}

#[test]
fn duplicate_rows_abort() {
	let dir = tempfile::tempdir().unwrap();
	write_inputs(dir.path(), 10, &["1001,2021-01-05,Alabama,Autauga,1000.0,99,0,False,False"]);
	match uscovid::run(&mut NullSink, &Config::with_data_dir(dir.path())) {
		Err(Error::DuplicateKey{location, date}) => {
			assert_eq!(location, fips("01001"));
			assert_eq!(date, NaiveDate::from_ymd(2021, 1, 5));
		},
		Err(other) => panic!("unexpected error: {}", other),
		Ok(_) => panic!("duplicate row was accepted"),
	}
}

#[test]
fn short_history_aborts() {
	let dir = tempfile::tempdir().unwrap();
	write_inputs(dir.path(), 5, &[]);
	match uscovid::run(&mut NullSink, &Config::with_data_dir(dir.path())) {
		Err(Error::InsufficientHistory{required, available}) => {
			assert_eq!(required, 8);
			assert_eq!(available, 5);
		},
		Err(other) => panic!("unexpected error: {}", other),
		Ok(_) => panic!("short history was accepted"),
	}
}

#[test]
fn metadata_mismatch_aborts() {
	let dir = tempfile::tempdir().unwrap();
	write_inputs(dir.path(), 10, &[]);
	fs::write(dir.path().join("us_counties_clean_meta.json"), r#"{"FIPS": "object", "Date": "object"}"#).unwrap();
	match uscovid::run(&mut NullSink, &Config::with_data_dir(dir.path())) {
		Err(Error::SchemaMismatch(_)) => (),
		Err(other) => panic!("unexpected error: {}", other),
		Ok(_) => panic!("mismatched metadata was accepted"),
	}
}
