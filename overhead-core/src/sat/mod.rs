///! Satellite selection, propagation and caching module
///!
///! Tracks a stable working set of orbital objects near an observer. Raw
///! element sets are pulled from the upstream catalog, a deterministic
///! selection is persisted on disk, and positions are propagated at request
///! time with the computed snapshot cached until the next refresh.
///!
///! ## Main Components
///! - `SatelliteManager`: orchestrates the refresh and query paths
///! - `SelectionStore`: persisted, append-only working set
///! - `compute_positions`: batch SGP4 propagation to geodetic samples

// ============ Core Data Structures ============
mod types;
pub use types::*;

// ============ Upstream Catalog Access ============
mod api_client;
pub use api_client::{fetch_catalog, DEFAULT_CATALOG_URL};

mod extractor;
pub use extractor::{extract_element_sets, parse_catalog_id};

// ============ Working Set Management ============
mod selection;
pub use selection::SelectionStore;

mod nearest;
pub use nearest::{NearestSet, RankedCandidate};

// ============ Propagation ============
mod propagate;
pub use propagate::{compute_positions, haversine_distance_m, Observer};

// ============ Cache Management ============
mod cache;
pub use cache::PositionCache;

// ============ Core Manager ============
mod manager;
pub use manager::{SatelliteManager, DEFAULT_TARGET_COUNT};
