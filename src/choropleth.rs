use std::io;

use log::debug;

use chrono::NaiveDate;

use geojson::{FeatureCollection, JsonValue};

use smartstring::alias::{String as SmartString};

use super::error::{Result, SchemaMismatch};
use super::geo::CountyBoundaries;
use super::table::SnapshotTable;


/// One snapshot column joined onto the county boundaries. Every boundary
/// feature carries `fips`, `region`, `subregion` and `value` properties;
/// `value` is null where the snapshot has no finite value.
#[derive(Debug, Clone)]
pub struct ChoroplethLayer {
	column: SmartString,
	date: NaiveDate,
	range: Option<(f64, f64)>,
	matched: usize,
	unmapped: usize,
	collection: FeatureCollection,
}

impl ChoroplethLayer {
	pub fn build(snapshot: &SnapshotTable, column: &str, boundaries: &CountyBoundaries) -> Result<Self> {
		let ci = match snapshot.column_index(column) {
			Some(ci) => ci,
			None => return Err(SchemaMismatch::UnusableColumn{
				column: column.into(),
				reason: "is not a snapshot column",
			}.into()),
		};

		let mut features = Vec::with_capacity(boundaries.len());
		let mut range: Option<(f64, f64)> = None;
		let mut matched = 0;
		for (fips, feature) in boundaries.iter() {
			let mut feature = feature.clone();
			let row = fips.and_then(|k| snapshot.get(&k));
			let value = row.map(|r| r.values[ci]).filter(|v| v.is_finite());
			if let Some(v) = value {
				range = Some(match range {
					Some((lo, hi)) => (lo.min(v), hi.max(v)),
					None => (v, v),
				});
			}
			if row.is_some() {
				matched += 1;
			}
			feature.set_property("fips", fips.map(|k| JsonValue::from(k.to_string())).unwrap_or(JsonValue::Null));
			feature.set_property("region", row.and_then(|r| r.region.as_deref()).map(JsonValue::from).unwrap_or(JsonValue::Null));
			feature.set_property("subregion", row.and_then(|r| r.subregion.as_deref()).map(JsonValue::from).unwrap_or(JsonValue::Null));
			feature.set_property("value", value.map(JsonValue::from).unwrap_or(JsonValue::Null));
			features.push(feature);
		}
		let unmapped = snapshot.rows().iter().filter(|r| !boundaries.contains(&r.location)).count();
		debug!(
			"layer {}: {} of {} features matched, {} rows without boundary",
			column, matched, features.len(), unmapped,
		);

		Ok(Self{
			column: column.into(),
			date: snapshot.date(),
			range,
			matched,
			unmapped,
			collection: FeatureCollection{
				bbox: boundaries.collection().bbox.clone(),
				features,
				foreign_members: None,
			},
		})
	}

	pub fn column(&self) -> &str {
		&self.column
	}

	pub fn date(&self) -> NaiveDate {
		self.date
	}

	/// Smallest and largest finite value, for the colour scale.
	pub fn range(&self) -> Option<(f64, f64)> {
		self.range
	}

	/// Number of boundary features with a snapshot row.
	pub fn matched(&self) -> usize {
		self.matched
	}

	/// Number of snapshot rows without a boundary feature.
	pub fn unmapped(&self) -> usize {
		self.unmapped
	}

	pub fn collection(&self) -> &FeatureCollection {
		&self.collection
	}

	pub fn write<W: io::Write>(&self, w: W) -> Result<()> {
		serde_json::to_writer(w, &self.collection)?;
		Ok(())
	}
}
