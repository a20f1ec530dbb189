//! Facility filter state shared by both list loaders and the poller.
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::model::Facility;

pub type SharedSelection = Arc<Mutex<FacilitySelection>>;

/// Known facilities plus the subset currently checked.
///
/// The "all facilities" checkbox is never stored: [`all_selected`] derives it
/// from the individual states after every mutation.
///
/// [`all_selected`]: FacilitySelection::all_selected
#[derive(Debug, Default, Clone)]
pub struct FacilitySelection {
    known: Vec<Facility>,
    selected: HashSet<String>,
    generation: u64,
}

/// Immutable view of the selection taken when a request is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityFilter {
    ids: Vec<String>,
    generation: u64,
}

impl FacilitySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedSelection {
        Arc::new(Mutex::new(self))
    }

    /// Install the facility list from the server. Every facility starts checked.
    pub fn replace_known(&mut self, facilities: Vec<Facility>) {
        self.selected = facilities.iter().map(|f| f.facility_id.clone()).collect();
        self.known = facilities;
        self.generation += 1;
    }

    /// Returns false (and leaves the selection alone) for an unknown id.
    pub fn toggle_facility(&mut self, id: &str, checked: bool) -> bool {
        if !self.known.iter().any(|f| f.facility_id == id) {
            warn!(facility_id = id, "ignoring toggle for unknown facility");
            return false;
        }
        if checked {
            self.selected.insert(id.to_string());
        } else {
            self.selected.remove(id);
        }
        self.generation += 1;
        true
    }

    pub fn toggle_all(&mut self, checked: bool) {
        if checked {
            self.selected = self.known.iter().map(|f| f.facility_id.clone()).collect();
        } else {
            self.selected.clear();
        }
        self.generation += 1;
    }

    pub fn all_selected(&self) -> bool {
        !self.known.is_empty() && self.known.iter().all(|f| self.selected.contains(&f.facility_id))
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn known(&self) -> &[Facility] {
        &self.known
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> FacilityFilter {
        FacilityFilter {
            ids: self
                .known
                .iter()
                .filter(|f| self.selected.contains(&f.facility_id))
                .map(|f| f.facility_id.clone())
                .collect(),
            generation: self.generation,
        }
    }
}

impl FacilityFilter {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query_value(&self) -> String {
        self.ids.join(",")
    }
}
