//! Spherical spatial index over transmitter sites.
//!
//! Sites are bulk-loaded into an R-tree as unit vectors. Chord length on the
//! unit sphere grows monotonically with great-circle angle, so the tree can
//! prune with plain euclidean envelopes; every candidate is then checked
//! against the exact haversine angle.

use hashbrown::HashMap;
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::{debug, info};

use crate::models::{GeoPoint, Operator, Technology, Transmitter};

/// Mean Earth radius used to convert between kilometers and radians
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Slack on the chord pre-filter so rounding never drops a true match
const CHORD_EPSILON: f64 = 1e-12;

/// A point on the sphere, in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpherePoint {
    pub lat: f64,
    pub lon: f64,
}

impl SpherePoint {
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.to_radians(),
            lon: lon.to_radians(),
        }
    }

    /// Unit vector on the sphere
    fn to_unit_vector(self) -> [f64; 3] {
        let (sin_lat, cos_lat) = self.lat.sin_cos();
        let (sin_lon, cos_lon) = self.lon.sin_cos();
        [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
    }
}

impl From<GeoPoint> for SpherePoint {
    fn from(p: GeoPoint) -> Self {
        SpherePoint::from_degrees(p.lat, p.lon)
    }
}

/// Great-circle angle between two points (haversine), in radians
pub fn haversine(a: SpherePoint, b: SpherePoint) -> f64 {
    let half_dlat = (b.lat - a.lat) * 0.5;
    let half_dlon = (b.lon - a.lon) * 0.5;
    let h = half_dlat.sin().powi(2) + a.lat.cos() * b.lat.cos() * half_dlon.sin().powi(2);
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Chord length on the unit sphere subtending the given angle
fn chord_for_angle(angle: f64) -> f64 {
    let angle = angle.clamp(0.0, std::f64::consts::PI);
    2.0 * (angle * 0.5).sin()
}

/// A transmitter site as stored in the R-tree
#[derive(Debug, Clone, Copy)]
pub struct IndexedSite {
    pub position: SpherePoint,
    xyz: [f64; 3],
}

impl IndexedSite {
    pub fn new(position: SpherePoint) -> Self {
        Self {
            position,
            xyz: position.to_unit_vector(),
        }
    }
}

impl RTreeObject for IndexedSite {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl PointDistance for IndexedSite {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.xyz[0] - point[0];
        let dy = self.xyz[1] - point[1];
        let dz = self.xyz[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Radius-query index over the transmitters of one (operator, technology) group.
///
/// Never empty: groups without transmitters get no index at all.
pub struct TransmitterIndex {
    tree: RTree<IndexedSite>,
}

impl TransmitterIndex {
    /// Build from sites already converted to radians
    pub fn build(sites: Vec<SpherePoint>) -> Option<Self> {
        if sites.is_empty() {
            return None;
        }
        let indexed: Vec<IndexedSite> = sites.into_iter().map(IndexedSite::new).collect();
        Some(Self {
            tree: RTree::bulk_load(indexed),
        })
    }

    /// All sites whose great-circle angle to `point` is at most `radius` radians
    pub fn within(
        &self,
        point: SpherePoint,
        radius: f64,
    ) -> impl Iterator<Item = &IndexedSite> + '_ {
        let chord = chord_for_angle(radius) + CHORD_EPSILON;
        self.tree
            .locate_within_distance(point.to_unit_vector(), chord * chord)
            .filter(move |site| haversine(site.position, point) <= radius)
    }

    /// Whether any site lies within `radius` radians of `point`
    pub fn any_within(&self, point: SpherePoint, radius: f64) -> bool {
        self.within(point, radius).next().is_some()
    }

    /// Angle in radians to the closest site
    pub fn nearest(&self, point: SpherePoint) -> Option<f64> {
        self.tree
            .nearest_neighbor(&point.to_unit_vector())
            .map(|site| haversine(site.position, point))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Spatial indices for every (operator, technology) group present in the data
#[derive(Default)]
pub struct CoverageIndex {
    groups: HashMap<(Operator, Technology), TransmitterIndex>,
}

impl CoverageIndex {
    /// Build one index per (operator, technology) group with at least one transmitter
    pub fn build(transmitters: &[Transmitter]) -> Self {
        info!(
            "Building coverage index for {} transmitters...",
            transmitters.len()
        );

        let mut grouped: HashMap<(Operator, Technology), Vec<SpherePoint>> = HashMap::new();
        for t in transmitters {
            for tech in Technology::all() {
                if t.supports(*tech) {
                    grouped
                        .entry((t.operator, *tech))
                        .or_default()
                        .push(SpherePoint::from_degrees(t.lat, t.lon));
                }
            }
        }

        let grouped: Vec<_> = grouped.into_iter().collect();
        let groups: HashMap<(Operator, Technology), TransmitterIndex> = grouped
            .into_par_iter()
            .filter_map(|(key, sites)| TransmitterIndex::build(sites).map(|index| (key, index)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        info!("Coverage index built with {} groups", groups.len());
        let mut keys: Vec<_> = groups.keys().copied().collect();
        keys.sort();
        for (op, tech) in keys {
            debug!("  {} {}: {} transmitters", op, tech, groups[&(op, tech)].len());
        }

        Self { groups }
    }

    pub fn get(&self, operator: Operator, technology: Technology) -> Option<&TransmitterIndex> {
        self.groups.get(&(operator, technology))
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
