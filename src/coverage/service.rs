//! Coverage query service.

use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

use super::index::{CoverageIndex, SpherePoint, EARTH_RADIUS_KM};
use crate::config::RadiusTable;
use crate::models::{CoverageMatrix, GeoPoint, Operator, Technology};

/// Answers coverage questions against a built index
pub struct CoverageService {
    index: Arc<CoverageIndex>,
    radii: RadiusTable,
    operators: Vec<Operator>,
}

impl CoverageService {
    pub fn new(index: Arc<CoverageIndex>, radii: RadiusTable, operators: Vec<Operator>) -> Self {
        Self {
            index,
            radii,
            operators,
        }
    }

    /// Whether at least one transmitter of `operator` supporting `technology`
    /// lies within that technology's coverage radius of (lat, lon).
    ///
    /// Coordinates are not validated; out-of-range input yields a
    /// meaningless but well-defined answer.
    pub fn is_covered(
        &self,
        lat: f64,
        lon: f64,
        operator: Operator,
        technology: Technology,
    ) -> bool {
        let Some(tree) = self.index.get(operator, technology) else {
            return false;
        };

        let point = SpherePoint::from_degrees(lat, lon);
        let covered = tree.any_within(point, self.radii.radians(technology));

        debug!(
            "Coverage at ({}, {}) for {} {}: {}",
            lat, lon, operator, technology, covered
        );
        covered
    }

    /// Coverage for every configured operator and every technology
    pub fn coverage(&self, lat: f64, lon: f64) -> CoverageMatrix {
        let mut matrix = CoverageMatrix::new();
        for op in &self.operators {
            let techs = matrix.entry(*op).or_default();
            for tech in Technology::all() {
                techs.insert(*tech, self.is_covered(lat, lon, *op, *tech));
            }
        }
        matrix
    }

    /// Evaluate many named points in parallel, preserving input order
    pub fn coverage_batch(&self, points: &[(String, GeoPoint)]) -> Vec<(String, CoverageMatrix)> {
        points
            .par_iter()
            .map(|(name, p)| (name.clone(), self.coverage(p.lat, p.lon)))
            .collect()
    }

    /// Distance in km to the closest transmitter of the group, if any exists
    pub fn nearest_km(
        &self,
        lat: f64,
        lon: f64,
        operator: Operator,
        technology: Technology,
    ) -> Option<f64> {
        self.index
            .get(operator, technology)?
            .nearest(SpherePoint::from_degrees(lat, lon))
            .map(|angle| angle * EARTH_RADIUS_KM)
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Get the spatial index (for stats/debugging)
    pub fn index(&self) -> &CoverageIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transmitter;

    const PARIS: (f64, f64) = (48.8566, 2.3522);
    // ~50 km east of central Paris
    const MEAUX_ISH: (f64, f64) = (48.8566, 3.0360);
    const MID_ATLANTIC: (f64, f64) = (46.2276, -10.0);

    fn service(transmitters: &[Transmitter], radii: RadiusTable) -> CoverageService {
        CoverageService::new(
            Arc::new(CoverageIndex::build(transmitters)),
            radii,
            Operator::all().to_vec(),
        )
    }

    fn paris_free_4g() -> Vec<Transmitter> {
        vec![Transmitter::new(Operator::Free, PARIS.0, PARIS.1).with(Technology::G4)]
    }

    fn sample_network() -> Vec<Transmitter> {
        let mut out = Vec::new();
        for (i, op) in Operator::all().iter().enumerate() {
            let offset = i as f64 * 0.01;
            out.push(
                Transmitter::new(*op, PARIS.0 + offset, PARIS.1 - offset)
                    .with(Technology::G2)
                    .with(Technology::G3)
                    .with(Technology::G4),
            );
            out.push(Transmitter::new(*op, 45.764, 4.8357 + offset).with(Technology::G2));
        }
        out
    }

    #[test]
    fn test_paris_boundary_scenario() {
        let svc = service(&paris_free_4g(), RadiusTable::default());

        assert!(svc.is_covered(PARIS.0, PARIS.1, Operator::Free, Technology::G4));
        assert!(!svc.is_covered(PARIS.0, PARIS.1, Operator::Free, Technology::G2));
        assert!(!svc.is_covered(MEAUX_ISH.0, MEAUX_ISH.1, Operator::Free, Technology::G4));

        let km = svc
            .nearest_km(MEAUX_ISH.0, MEAUX_ISH.1, Operator::Free, Technology::G4)
            .unwrap();
        assert!((45.0..55.0).contains(&km), "got {}", km);
    }

    #[test]
    fn test_exact_location_property() {
        let transmitters = sample_network();
        let svc = service(&transmitters, RadiusTable::default());
        for t in &transmitters {
            for tech in Technology::all() {
                if t.supports(*tech) {
                    assert!(svc.is_covered(t.lat, t.lon, t.operator, *tech));
                }
            }
        }
    }

    #[test]
    fn test_exact_location_with_zero_radius() {
        let radii = RadiusTable {
            g2: 0.0,
            g3: 0.0,
            g4: 0.0,
        };
        let svc = service(&paris_free_4g(), radii);
        assert!(svc.is_covered(PARIS.0, PARIS.1, Operator::Free, Technology::G4));
        assert!(!svc.is_covered(PARIS.0 + 0.001, PARIS.1, Operator::Free, Technology::G4));
    }

    #[test]
    fn test_monotonic_in_radius() {
        let transmitters = sample_network();
        let queries: Vec<(f64, f64)> = (0..40)
            .map(|i| (44.0 + i as f64 * 0.15, 1.0 + i as f64 * 0.12))
            .collect();

        let mut previous: Option<Vec<bool>> = None;
        for km in [0.0, 1.0, 5.0, 10.0, 30.0, 80.0, 200.0] {
            let svc = service(&transmitters, RadiusTable::default().with(Technology::G2, km));
            let current: Vec<bool> = queries
                .iter()
                .map(|(lat, lon)| svc.is_covered(*lat, *lon, Operator::Sfr, Technology::G2))
                .collect();
            if let Some(prev) = &previous {
                for (before, after) in prev.iter().zip(&current) {
                    assert!(!before || *after);
                }
            }
            previous = Some(current);
        }
    }

    #[test]
    fn test_absent_group_never_covered() {
        let svc = service(&paris_free_4g(), RadiusTable::default());
        for tech in Technology::all() {
            assert!(!svc.is_covered(PARIS.0, PARIS.1, Operator::Orange, *tech));
        }
        assert!(svc.nearest_km(PARIS.0, PARIS.1, Operator::Orange, Technology::G4).is_none());
    }

    #[test]
    fn test_empty_table() {
        let svc = service(&[], RadiusTable::default());
        assert!(svc.index().is_empty());
        let matrix = svc.coverage(PARIS.0, PARIS.1);
        assert_eq!(matrix.len(), 4);
        assert!(matrix.values().flat_map(|t| t.values()).all(|c| !c));
    }

    #[test]
    fn test_mid_ocean_uncovered() {
        let svc = service(&sample_network(), RadiusTable::default());
        let matrix = svc.coverage(MID_ATLANTIC.0, MID_ATLANTIC.1);
        assert!(matrix.values().flat_map(|t| t.values()).all(|c| !c));
    }

    #[test]
    fn test_out_of_range_input_does_not_panic() {
        let svc = service(&sample_network(), RadiusTable::default());
        assert!(!svc.is_covered(123.0, 456.0, Operator::Orange, Technology::G2));
        assert!(!svc.is_covered(f64::NAN, 2.0, Operator::Orange, Technology::G2));
    }

    #[test]
    fn test_coverage_matrix_shape() {
        let svc = CoverageService::new(
            Arc::new(CoverageIndex::build(&sample_network())),
            RadiusTable::default(),
            vec![Operator::Orange, Operator::Free],
        );
        let matrix = svc.coverage(PARIS.0, PARIS.1);
        assert_eq!(
            matrix.keys().copied().collect::<Vec<_>>(),
            vec![Operator::Orange, Operator::Free]
        );
        for techs in matrix.values() {
            assert_eq!(techs.len(), 3);
            assert!(techs.values().all(|c| *c));
        }
    }

    #[test]
    fn test_matrix_uses_canonical_operator_order() {
        let svc = CoverageService::new(
            Arc::new(CoverageIndex::build(&sample_network())),
            RadiusTable::default(),
            vec![Operator::Free, Operator::Sfr, Operator::Orange],
        );
        let matrix = svc.coverage(PARIS.0, PARIS.1);
        assert_eq!(
            matrix.keys().copied().collect::<Vec<_>>(),
            vec![Operator::Orange, Operator::Sfr, Operator::Free]
        );
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let transmitters = sample_network();
        let a = service(&transmitters, RadiusTable::default());
        let b = service(&transmitters, RadiusTable::default());
        let points: Vec<(String, GeoPoint)> = (0..30)
            .map(|i| {
                (
                    format!("p{}", i),
                    GeoPoint::new(45.0 + i as f64 * 0.13, 2.0 + i as f64 * 0.1),
                )
            })
            .collect();
        assert_eq!(a.coverage_batch(&points), b.coverage_batch(&points));
    }

    #[test]
    fn test_batch_preserves_order() {
        let svc = service(&paris_free_4g(), RadiusTable::default());
        let points = vec![
            ("paris".to_string(), GeoPoint::new(PARIS.0, PARIS.1)),
            ("ocean".to_string(), GeoPoint::new(MID_ATLANTIC.0, MID_ATLANTIC.1)),
        ];
        let results = svc.coverage_batch(&points);
        assert_eq!(results[0].0, "paris");
        assert!(results[0].1[&Operator::Free][&Technology::G4]);
        assert_eq!(results[1].0, "ocean");
        assert!(!results[1].1[&Operator::Free][&Technology::G4]);
    }
}
