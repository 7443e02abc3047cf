// SelectionController: turns pointer events over the country layer into
// hover and selection semantics. Pure state machine; the GUI feeds it hits
// from the pointer probe and applies the viewport requests it returns.
use rustc_hash::FxHashSet;

use crate::geometry::{GeoBounds, Geometry};
use crate::map::layer::HoverTable;

/// What the camera should do after a selection transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportRequest {
    None,
    /// Frame the clicked country.
    Fit(GeoBounds),
    /// Back to the default view (dismissal).
    Reset,
}

#[derive(Default)]
pub struct SelectionController {
    hovered: Option<String>,
    selected: Option<String>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Pointer moved over the layer. Returns true when hover state changed;
    /// repeated moves over the same feature are no-ops.
    pub fn pointer_move(
        &mut self,
        hit: Option<&str>,
        visited: &FxHashSet<String>,
        hover: &mut HoverTable,
    ) -> bool {
        let next = hit.filter(|code| visited.contains(*code)).map(str::to_owned);
        if self.hovered == next {
            return false;
        }
        if let Some(prev) = self.hovered.take() {
            hover.clear(&prev);
        }
        if let Some(code) = next.as_deref() {
            hover.mark(code);
        }
        self.hovered = next;
        true
    }

    /// Pointer left the layer: hover is cleared unconditionally.
    pub fn pointer_leave(&mut self, hover: &mut HoverTable) {
        self.hovered = None;
        hover.clear_all();
    }

    /// A click landed on the map. A hit on a visited country selects it and
    /// asks for a bounds fit; anything else clears the selection, which is a
    /// dismissal (with viewport reset) when a panel was open and a plain
    /// no-op on the camera otherwise.
    pub fn click(
        &mut self,
        hit: Option<(&str, &Geometry)>,
        visited: &FxHashSet<String>,
    ) -> ViewportRequest {
        if let Some((code, geometry)) = hit {
            if visited.contains(code) {
                if let Some(bounds) = geometry.bounding_box() {
                    self.selected = Some(code.to_owned());
                    return ViewportRequest::Fit(bounds);
                }
            }
        }
        self.dismiss()
    }

    /// Close the panel: close button, backdrop click and Escape all land
    /// here, so every dismissal path produces the same transition.
    pub fn dismiss(&mut self) -> ViewportRequest {
        if self.selected.take().is_some() {
            ViewportRequest::Reset
        } else {
            ViewportRequest::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visited(codes: &[&str]) -> FxHashSet<String> {
        codes.iter().map(|c| (*c).to_owned()).collect()
    }

    fn square(lon: f64, lat: f64) -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![
                [lon, lat],
                [lon + 1.0, lat],
                [lon + 1.0, lat + 1.0],
                [lon, lat + 1.0],
                [lon, lat],
            ]],
        }
    }

    #[test]
    fn hover_is_idempotent_over_the_same_feature() {
        let mut controller = SelectionController::new();
        let mut hover = HoverTable::default();
        let set = visited(&["LUX"]);

        assert!(controller.pointer_move(Some("LUX"), &set, &mut hover));
        assert!(hover.is_hovered("LUX"));
        // further moves over the same feature write nothing
        assert!(!controller.pointer_move(Some("LUX"), &set, &mut hover));
        assert!(!controller.pointer_move(Some("LUX"), &set, &mut hover));
    }

    #[test]
    fn hover_swaps_to_the_new_feature() {
        let mut controller = SelectionController::new();
        let mut hover = HoverTable::default();
        let set = visited(&["LUX", "JAM"]);

        controller.pointer_move(Some("LUX"), &set, &mut hover);
        assert!(controller.pointer_move(Some("JAM"), &set, &mut hover));
        assert!(!hover.is_hovered("LUX"));
        assert!(hover.is_hovered("JAM"));
    }

    #[test]
    fn unvisited_features_do_not_hover() {
        let mut controller = SelectionController::new();
        let mut hover = HoverTable::default();
        let set = visited(&["LUX"]);

        assert!(!controller.pointer_move(Some("FRA"), &set, &mut hover));
        assert!(controller.hovered().is_none());

        // moving from a visited feature onto an unvisited one clears the flag
        controller.pointer_move(Some("LUX"), &set, &mut hover);
        assert!(controller.pointer_move(Some("FRA"), &set, &mut hover));
        assert!(!hover.is_hovered("LUX"));
    }

    #[test]
    fn pointer_leave_clears_unconditionally() {
        let mut controller = SelectionController::new();
        let mut hover = HoverTable::default();
        let set = visited(&["LUX"]);

        controller.pointer_move(Some("LUX"), &set, &mut hover);
        controller.pointer_leave(&mut hover);
        assert!(controller.hovered().is_none());
        assert!(!hover.is_hovered("LUX"));

        // leaving with nothing hovered is fine too
        controller.pointer_leave(&mut hover);
    }

    #[test]
    fn click_on_visited_selects_and_fits() {
        let mut controller = SelectionController::new();
        let set = visited(&["LUX", "JAM"]);
        let geometry = square(5.7, 49.4);

        let request = controller.click(Some(("LUX", &geometry)), &set);
        assert_eq!(controller.selected(), Some("LUX"));
        let ViewportRequest::Fit(bounds) = request else {
            panic!("expected a fit request, got {request:?}");
        };
        // the fitted box must contain every vertex of the clicked feature
        geometry.each_position(&mut |p| assert!(bounds.contains(p), "vertex {p:?} outside"));
    }

    #[test]
    fn click_off_without_a_panel_leaves_the_camera_alone() {
        let mut controller = SelectionController::new();
        let set = visited(&["LUX"]);

        assert_eq!(controller.click(None, &set), ViewportRequest::None);
        assert_eq!(controller.selected(), None);

        let fra = square(2.0, 46.0);
        assert_eq!(controller.click(Some(("FRA", &fra)), &set), ViewportRequest::None);
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn selection_scenario_lux_then_fra() {
        let mut controller = SelectionController::new();
        let set = visited(&["LUX", "JAM"]);

        controller.click(Some(("LUX", &square(5.7, 49.4))), &set);
        assert_eq!(controller.selected(), Some("LUX"));

        // FRA is not in the set: the open panel is dismissed, camera resets
        let request = controller.click(Some(("FRA", &square(2.0, 46.0))), &set);
        assert_eq!(request, ViewportRequest::Reset);
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn switching_selection_directly_between_visited_countries() {
        let mut controller = SelectionController::new();
        let set = visited(&["LUX", "JAM"]);

        controller.click(Some(("LUX", &square(5.7, 49.4))), &set);
        let request = controller.click(Some(("JAM", &square(-77.5, 17.7))), &set);
        assert!(matches!(request, ViewportRequest::Fit(_)));
        assert_eq!(controller.selected(), Some("JAM"));
    }

    #[test]
    fn dismissal_paths_converge() {
        let set = visited(&["LUX"]);
        let geometry = square(5.7, 49.4);

        // close button / Escape
        let mut controller = SelectionController::new();
        controller.click(Some(("LUX", &geometry)), &set);
        assert_eq!(controller.dismiss(), ViewportRequest::Reset);
        assert_eq!(controller.selected(), None);

        // backdrop click (a click that selects nothing while the panel is open)
        let mut controller = SelectionController::new();
        controller.click(Some(("LUX", &geometry)), &set);
        assert_eq!(controller.click(None, &set), ViewportRequest::Reset);
        assert_eq!(controller.selected(), None);

        // dismissing with nothing open does nothing
        assert_eq!(controller.dismiss(), ViewportRequest::None);
    }

    #[test]
    fn zero_visit_membership_is_enough_to_select() {
        // the visited set is the dataset key set; a country with an empty
        // visit list still selects
        let mut controller = SelectionController::new();
        let set = visited(&["FRA"]);
        let request = controller.click(Some(("FRA", &square(2.0, 46.0))), &set);
        assert!(matches!(request, ViewportRequest::Fit(_)));
        assert_eq!(controller.selected(), Some("FRA"));
    }
}
