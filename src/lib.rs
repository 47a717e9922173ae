mod error;
mod fips;
mod schema;
mod table;
mod timeseries;
mod collapse;
mod metrics;
mod dataset;
mod geo;
mod choropleth;
mod pipeline;
mod progress;

pub use error::*;
pub use fips::*;
pub use schema::*;
pub use table::*;
pub use timeseries::*;
pub use collapse::*;
pub use metrics::*;
pub use dataset::*;
pub use geo::*;
pub use choropleth::*;
pub use pipeline::*;
pub use progress::*;
