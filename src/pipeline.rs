use std::env;
use std::path::PathBuf;

use log::info;

use smartstring::alias::{String as SmartString};

use super::collapse::collapse;
use super::dataset::{load_long_table, load_types};
use super::error::Result;
use super::geo::DEFAULT_BOUNDARIES_URL;
use super::metrics::{add_per_capita, latest, this_week, AttributeNames};
use super::progress::ProgressSink;
use super::schema::ColumnType;
use super::table::{SnapshotTable, WideTable};


/// The only environment variable the crate reads.
pub static DATA_DIR_ENV: &'static str = "COVID_DATA_DIR";


#[derive(Debug, Clone)]
pub struct Config {
	/// Directory prefix of both input files.
	pub data_dir: PathBuf,
	pub cases_file: String,
	pub metadata_file: String,
	pub location_column: SmartString,
	pub date_column: SmartString,
	pub attributes: AttributeNames,
	/// Tracked count columns; each also gets a per-capita variant.
	pub counts: Vec<SmartString>,
	pub boundaries_url: String,
}

impl Default for Config {
	fn default() -> Self {
		Self{
			data_dir: PathBuf::from("data"),
			cases_file: "us_counties_clean.csv".into(),
			metadata_file: "us_counties_clean_meta.json".into(),
			location_column: "FIPS".into(),
			date_column: "Date".into(),
			attributes: AttributeNames::default(),
			counts: vec!["Confirmed".into(), "Deaths".into()],
			boundaries_url: DEFAULT_BOUNDARIES_URL.into(),
		}
	}
}

impl Config {
	pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
		Self{
			data_dir: data_dir.into(),
			..Self::default()
		}
	}

	/// Defaults, with `data_dir` taken from `COVID_DATA_DIR` if set.
	pub fn from_env() -> Self {
		match env::var_os(DATA_DIR_ENV) {
			Some(dir) => Self::with_data_dir(dir),
			None => Self::default(),
		}
	}

	pub fn cases_path(&self) -> PathBuf {
		self.data_dir.join(&self.cases_file)
	}

	pub fn metadata_path(&self) -> PathBuf {
		self.data_dir.join(&self.metadata_file)
	}
}


pub struct Snapshots {
	/// Value at the most recent date.
	pub latest: SnapshotTable,
	/// Change over the trailing week.
	pub this_week: SnapshotTable,
	/// Columns present in both snapshots: the counts, then their per-capita
	/// variants.
	pub columns: Vec<SmartString>,
}


/// Load the long table and collapse it. The tracked counts and every flag
/// column become measurements; everything else becomes an attribute.
pub fn load<S: ProgressSink + ?Sized>(s: &mut S, config: &Config) -> Result<WideTable> {
	info!("loading column types from {}", config.metadata_path().display());
	let types = load_types(config.metadata_path())?;
	info!("loading cases from {}", config.cases_path().display());
	let long = load_long_table(s, config.cases_path(), &types, &config.location_column, &config.date_column)?;

	let mut measurements: Vec<&str> = config.counts.iter().map(|c| c.as_str()).collect();
	for column in long.columns() {
		if column.kind == ColumnType::Flag && !measurements.contains(&column.name.as_str()) {
			measurements.push(&column.name);
		}
	}
	info!("collapsing {} rows on {} measurements", long.len(), measurements.len());
	collapse(&long, &measurements[..])
}

/// Append per-capita columns and take both snapshots.
pub fn derive(table: &mut WideTable, config: &Config) -> Result<Snapshots> {
	let counts: Vec<&str> = config.counts.iter().map(|c| c.as_str()).collect();
	let per_capita = add_per_capita(table, &counts[..], &config.attributes.population)?;

	let mut columns: Vec<SmartString> = config.counts.clone();
	columns.extend(per_capita);
	let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();

	let latest = latest(table, &names[..], &config.attributes)?;
	let this_week = this_week(table, &names[..], &config.attributes)?;
	info!("derived snapshots for {} locations at {}", latest.len(), latest.date());
	Ok(Snapshots{
		latest,
		this_week,
		columns,
	})
}

pub fn run<S: ProgressSink + ?Sized>(s: &mut S, config: &Config) -> Result<(WideTable, Snapshots)> {
	let mut table = load(s, config)?;
	let snapshots = derive(&mut table, config)?;
	Ok((table, snapshots))
}
