// ── Marker reconciliation ──
//
// Diffs the desired marker set against what is already on the surface and
// issues the smallest set of surface calls that closes the gap. Feeding
// the same desired set twice produces no calls the second time.

use std::collections::{HashMap, HashSet};

use super::marker::PopupContent;
use super::surface::{MapSurface, MarkerSpec};
use crate::model::StationId;

/// One marker the renderer wants on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredMarker {
    pub id: StationId,
    pub spec: MarkerSpec,
    pub popup: PopupContent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub removed: usize,
    pub icon_updates: usize,
    pub popup_updates: usize,
    /// Popup content swapped while that popup was open.
    pub rebound: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug)]
struct Binding {
    spec: MarkerSpec,
    popup: PopupContent,
}

/// The renderer's record of markers currently on the surface.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    bindings: HashMap<StationId, Binding>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &StationId) -> bool {
        self.bindings.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn ids(&self) -> HashSet<StationId> {
        self.bindings.keys().cloned().collect()
    }

    pub fn spec(&self, id: &StationId) -> Option<&MarkerSpec> {
        self.bindings.get(id).map(|b| &b.spec)
    }

    /// Content currently bound to a marker's popup. Delegated popup
    /// actions are resolved against this, never against stale content.
    pub fn popup(&self, id: &StationId) -> Option<&PopupContent> {
        self.bindings.get(id).map(|b| &b.popup)
    }

    pub fn reconcile<S: MapSurface + ?Sized>(
        &mut self,
        desired: &[DesiredMarker],
        surface: &mut S,
        open_popup: Option<&StationId>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let wanted: HashSet<&StationId> = desired.iter().map(|d| &d.id).collect();

        let stale: Vec<StationId> = self
            .bindings
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            self.bindings.remove(&id);
            surface.remove_marker(&id);
            report.removed += 1;
        }

        for marker in desired {
            match self.bindings.get_mut(&marker.id) {
                None => {
                    surface.add_marker(&marker.id, &marker.spec, &marker.popup);
                    self.bindings.insert(
                        marker.id.clone(),
                        Binding {
                            spec: marker.spec.clone(),
                            popup: marker.popup.clone(),
                        },
                    );
                    report.created += 1;
                }
                Some(binding) => {
                    if binding.spec != marker.spec {
                        surface.update_marker(&marker.id, &marker.spec);
                        binding.spec = marker.spec.clone();
                        report.icon_updates += 1;
                    }
                    if binding.popup != marker.popup {
                        surface.set_popup_content(&marker.id, &marker.popup);
                        binding.popup = marker.popup.clone();
                        report.popup_updates += 1;
                        if open_popup == Some(&marker.id) {
                            report.rebound += 1;
                        }
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::marker::{MarkerMode, MarkerVisual};
    use crate::map::surface::RecordingSurface;
    use crate::model::{LatLng, Station, StationStatus, TransportType};
    use crate::occupancy::OccupancyPolicy;

    fn desired(id: &str, available: u32, mode: MarkerMode) -> DesiredMarker {
        let station = Station {
            id: StationId::from(id),
            name: id.to_owned(),
            transport: TransportType::Bus,
            location: LatLng::new(41.0, 29.0),
            capacity: 10,
            available,
            status: StationStatus::Active,
            last_update: None,
            is_custom: false,
            owner_id: None,
        };
        DesiredMarker {
            id: station.id.clone(),
            spec: MarkerSpec {
                position: station.location,
                mode,
                visual: MarkerVisual::for_station(&station, mode),
            },
            popup: PopupContent::build(&station, false, &OccupancyPolicy::default()),
        }
    }

    #[test]
    fn second_pass_with_same_input_is_noop() {
        let mut registry = MarkerRegistry::new();
        let mut surface = RecordingSurface::new();
        let input = vec![desired("a", 1, MarkerMode::Dot), desired("b", 2, MarkerMode::Dot)];

        let first = registry.reconcile(&input, &mut surface, None);
        assert_eq!(first.created, 2);
        let ops_after_first = surface.ops.len();

        let second = registry.reconcile(&input, &mut surface, None);
        assert!(second.is_noop());
        assert_eq!(surface.ops.len(), ops_after_first);
    }

    #[test]
    fn removes_and_updates_minimally() {
        let mut registry = MarkerRegistry::new();
        let mut surface = RecordingSurface::new();
        registry.reconcile(
            &[desired("a", 1, MarkerMode::Dot), desired("b", 2, MarkerMode::Dot)],
            &mut surface,
            None,
        );

        let report = registry.reconcile(
            &[desired("a", 1, MarkerMode::Detailed)],
            &mut surface,
            None,
        );
        assert_eq!(report.removed, 1);
        assert_eq!(report.icon_updates, 1);
        assert_eq!(report.popup_updates, 0);
        assert_eq!(surface.marker_ids(), vec![StationId::from("a")]);
    }

    #[test]
    fn open_popup_content_is_rebound() {
        let mut registry = MarkerRegistry::new();
        let mut surface = RecordingSurface::new();
        let a = StationId::from("a");
        registry.reconcile(&[desired("a", 1, MarkerMode::Detailed)], &mut surface, Some(&a));
        let report =
            registry.reconcile(&[desired("a", 7, MarkerMode::Detailed)], &mut surface, Some(&a));
        assert_eq!((report.popup_updates, report.rebound), (1, 1));
        assert_eq!(registry.popup(&a).map(|p| p.available), Some(7));
        assert_eq!(surface.popups[&a].available, 7);
    }
}
