use std::collections::HashMap;
use std::convert::TryFrom;
use std::str::FromStr;

use log::{info, trace, warn};

use geojson::{feature, Feature, FeatureCollection, GeoJson};

use super::error::{FetchError, Result};
use super::fips::Fips;


pub static DEFAULT_BOUNDARIES_URL: &'static str = "https://raw.githubusercontent.com/plotly/datasets/master/geojson-counties-fips.json";


fn feature_fips(f: &Feature) -> Option<Fips> {
	match f.id.as_ref()? {
		feature::Id::String(s) => Fips::from_str(s).ok(),
		feature::Id::Number(n) => u32::try_from(n.as_u64()?).ok().and_then(Fips::new),
	}
}


/// County boundary features, addressable by the FIPS code in their `id`.
#[derive(Debug, Clone)]
pub struct CountyBoundaries {
	collection: FeatureCollection,
	index: HashMap<Fips, usize>,
}

impl CountyBoundaries {
	pub fn new(collection: FeatureCollection) -> Self {
		let mut index = HashMap::new();
		let mut unkeyed = 0;
		for (i, f) in collection.features.iter().enumerate() {
			match feature_fips(f) {
				Some(fips) => {
					index.insert(fips, i);
				},
				None => unkeyed += 1,
			}
		}
		if unkeyed > 0 {
			warn!("{} boundary features have no usable FIPS id", unkeyed);
		}
		Self{collection, index}
	}

	pub fn len(&self) -> usize {
		self.collection.features.len()
	}

	pub fn is_empty(&self) -> bool {
		self.collection.features.is_empty()
	}

	pub fn get(&self, fips: &Fips) -> Option<&Feature> {
		Some(&self.collection.features[*self.index.get(fips)?])
	}

	pub fn contains(&self, fips: &Fips) -> bool {
		self.index.contains_key(fips)
	}

	/// Features in source order, with their FIPS code if they have one.
	pub fn iter(&self) -> impl Iterator<Item = (Option<Fips>, &Feature)> + '_ {
		self.collection.features.iter().map(|f| (feature_fips(f), f))
	}

	pub fn collection(&self) -> &FeatureCollection {
		&self.collection
	}
}

impl FromStr for CountyBoundaries {
	type Err = FetchError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		let geojson = s.parse::<GeoJson>().map_err(|e| FetchError::Malformed(e.to_string()))?;
		match geojson {
			GeoJson::FeatureCollection(fc) => Ok(Self::new(fc)),
			_ => Err(FetchError::Malformed("not a FeatureCollection".into())),
		}
	}
}


/// A single unauthenticated GET. Failures are not retried.
pub fn fetch_boundaries(client: &reqwest::blocking::Client, url: &str) -> Result<CountyBoundaries> {
	info!("fetching county boundaries from {}", url);
	let resp = client.get(url).send()?;
	let status = resp.status();
	trace!("boundary request returned {}", status);
	if !status.is_success() {
		return Err(FetchError::Status(status).into())
	}
	let body = resp.text()?;
	let boundaries: CountyBoundaries = body.parse()?;
	info!("got {} boundary features", boundaries.len());
	Ok(boundaries)
}
