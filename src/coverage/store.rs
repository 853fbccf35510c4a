//! Lazily built, clearable holder for the coverage service.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use super::{CoverageIndex, CoverageService, TransmitterTable};
use crate::config::RadiusTable;
use crate::error::Result;
use crate::models::{Operator, Technology};

/// Where the transmitter table comes from
#[derive(Debug, Clone)]
pub enum TableSource {
    File(PathBuf),
    Memory(Arc<TransmitterTable>),
}

impl TableSource {
    fn load(&self) -> Result<Arc<TransmitterTable>> {
        match self {
            TableSource::File(path) => Ok(Arc::new(TransmitterTable::load(path)?)),
            TableSource::Memory(table) => Ok(Arc::clone(table)),
        }
    }
}

struct Loaded {
    service: Arc<CoverageService>,
    fingerprint: u64,
}

/// Builds the coverage service at most once until explicitly cleared.
///
/// Concurrent first callers block on the same build instead of racing.
pub struct CoverageStore {
    source: TableSource,
    radii: RadiusTable,
    operators: Vec<Operator>,
    loaded: RwLock<Option<Loaded>>,
}

impl CoverageStore {
    pub fn new(source: TableSource, radii: RadiusTable, operators: Vec<Operator>) -> Self {
        Self {
            source,
            radii,
            operators,
            loaded: RwLock::new(None),
        }
    }

    /// Return the service, building it from the table on first use
    pub fn service(&self) -> Result<Arc<CoverageService>> {
        if let Some(loaded) = self
            .loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(&loaded.service));
        }

        let mut guard = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(loaded) = guard.as_ref() {
            return Ok(Arc::clone(&loaded.service));
        }

        let table = self.source.load()?;
        let fingerprint = table.fingerprint();
        let index = CoverageIndex::build(table.transmitters());
        let service = Arc::new(CoverageService::new(
            Arc::new(index),
            self.radii,
            self.operators.clone(),
        ));
        info!("Coverage service ready (table fingerprint {:016x})", fingerprint);

        *guard = Some(Loaded {
            service: Arc::clone(&service),
            fingerprint,
        });
        Ok(service)
    }

    pub fn is_covered(
        &self,
        lat: f64,
        lon: f64,
        operator: Operator,
        technology: Technology,
    ) -> Result<bool> {
        Ok(self.service()?.is_covered(lat, lon, operator, technology))
    }

    /// Drop the built index; the next query rebuilds it from the source
    pub fn clear_cache(&self) {
        let previous = self
            .loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!("Coverage cache cleared");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Fingerprint of the table currently backing the service
    pub fn fingerprint(&self) -> Option<u64> {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|l| l.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoverageError;
    use crate::models::Transmitter;
    use std::path::Path;

    fn paris_table() -> TransmitterTable {
        TransmitterTable::new(vec![
            Transmitter::new(Operator::Free, 48.8566, 2.3522).with(Technology::G4)
        ])
    }

    fn store(source: TableSource) -> CoverageStore {
        CoverageStore::new(source, RadiusTable::default(), Operator::all().to_vec())
    }

    #[test]
    fn test_lazy_build_and_reuse() {
        let store = store(TableSource::Memory(Arc::new(paris_table())));
        assert!(!store.is_loaded());

        assert!(store
            .is_covered(48.8566, 2.3522, Operator::Free, Technology::G4)
            .unwrap());
        assert!(store.is_loaded());

        let a = store.service().unwrap();
        let b = store.service().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_clear_cache_rebuilds_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("towers.csv");
        paris_table().write(&path).unwrap();

        let store = store(TableSource::File(path.clone()));
        assert!(store
            .is_covered(48.8566, 2.3522, Operator::Free, Technology::G4)
            .unwrap());
        let first = store.fingerprint().unwrap();

        // Replace the data on disk; the cached index keeps answering from the old table
        TransmitterTable::default().write(&path).unwrap();
        assert!(store
            .is_covered(48.8566, 2.3522, Operator::Free, Technology::G4)
            .unwrap());

        store.clear_cache();
        assert!(!store.is_loaded());
        assert!(store.fingerprint().is_none());

        assert!(!store
            .is_covered(48.8566, 2.3522, Operator::Free, Technology::G4)
            .unwrap());
        assert_ne!(store.fingerprint().unwrap(), first);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let store = store(TableSource::File(Path::new("/nonexistent/towers.csv").into()));
        let err = store.service().err().unwrap();
        assert!(matches!(err, CoverageError::Io { .. }));
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_concurrent_first_access_builds_once() {
        let store = Arc::new(store(TableSource::Memory(Arc::new(paris_table()))));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.service().unwrap())
            })
            .collect();
        let services: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for s in &services[1..] {
            assert!(Arc::ptr_eq(&services[0], s));
        }
    }
}
