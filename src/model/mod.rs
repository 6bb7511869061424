pub mod geo;
pub mod types;

pub use geo::{BBox, Feature, FeatureCollection, Geometry, LatLon};
pub use types::{BacklogGroup, BacklogPon, Cto, ImportSummary, Olt, Ont, Pon};
