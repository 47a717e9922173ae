use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::info;

use uscovid::{ChoroplethLayer, CountyBoundaries, SnapshotTable};


fn write_layers(
		outdir: &Path,
		prefix: &str,
		snapshot: &SnapshotTable,
		boundaries: &CountyBoundaries,
) -> Result<(), uscovid::Error> {
	{
		let path = outdir.join(format!("{}.csv", prefix));
		println!("writing {} ...", path.display());
		snapshot.write_csv(io::BufWriter::new(File::create(path)?))?;
	}
	for column in snapshot.columns() {
		let layer = ChoroplethLayer::build(snapshot, column, boundaries)?;
		let path = outdir.join(format!("{}_{}.geojson", prefix, column));
		match layer.range() {
			Some((lo, hi)) => info!("{} {}: range {} .. {}", prefix, column, lo, hi),
			None => info!("{} {}: no values", prefix, column),
		}
		println!("writing {} ...", path.display());
		layer.write(io::BufWriter::new(File::create(path)?))?;
	}
	Ok(())
}


fn main() -> Result<(), Box<dyn std::error::Error>> {
	pretty_env_logger::init();

	let argv: Vec<String> = std::env::args().collect();
	let outdir = match argv.get(1) {
		Some(p) => Path::new(p),
		None => {
			eprintln!("usage: {} OUTPUT_DIR", argv[0]);
			std::process::exit(2);
		},
	};
	fs::create_dir_all(outdir)?;

	let config = uscovid::Config::from_env();

	println!("loading {} ...", config.cases_path().display());
	let (table, snapshots) = uscovid::run(&mut *uscovid::default_output(), &config)?;
	println!(
		"{} locations, {} dates ({} .. {})",
		table.len(),
		table.axis().len(),
		table.axis().first().map(|d| d.to_string()).unwrap_or_default(),
		table.axis().last().map(|d| d.to_string()).unwrap_or_default(),
	);

	println!("fetching county boundaries ...");
	let client = reqwest::blocking::Client::new();
	let boundaries = uscovid::fetch_boundaries(&client, &config.boundaries_url)?;

	write_layers(outdir, "latest", &snapshots.latest, &boundaries)?;
	write_layers(outdir, "this_week", &snapshots.this_week, &boundaries)?;
	Ok(())
}
