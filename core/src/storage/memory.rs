use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::interface::record::{AveragedSpectrum, EpochKey, ExperimentRecord};
use crate::interface::store::{ResultStore, StoreError};

/// In-process result store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: RefCell<Option<BTreeMap<String, ExperimentRecord>>>,
    spectra: RefCell<HashMap<EpochKey, AveragedSpectrum>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_created(&self) -> bool {
        self.records.borrow().is_some()
    }

    pub fn records(&self) -> BTreeMap<String, ExperimentRecord> {
        self.records.borrow().clone().unwrap_or_default()
    }

    pub fn spectrum(&self, epoch: &EpochKey) -> Option<AveragedSpectrum> {
        self.spectra.borrow().get(epoch).cloned()
    }
}

impl ResultStore for MemoryResultStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .borrow()
            .as_ref()
            .is_some_and(|records| records.contains_key(key)))
    }

    fn create_if_absent(&self) -> Result<(), StoreError> {
        self.records.borrow_mut().get_or_insert_with(BTreeMap::new);
        Ok(())
    }

    fn append(&self, key: &str, record: &ExperimentRecord) -> Result<(), StoreError> {
        self.records
            .borrow_mut()
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    fn write_spectrum(
        &self,
        epoch: &EpochKey,
        spectrum: &AveragedSpectrum,
    ) -> Result<(), StoreError> {
        self.spectra
            .borrow_mut()
            .insert(epoch.clone(), spectrum.clone());
        Ok(())
    }
}
