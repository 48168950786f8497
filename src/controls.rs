use crate::filter::{Facet, FilterState};
use crate::site::SiteRecord;
use std::collections::BTreeSet;

/// One checkbox bound to a facet value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    pub id: String,
    pub value: String,
    pub checked: bool,
}

/// The checkbox list for a single facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleGroup {
    pub facet: Facet,
    pub toggles: Vec<Toggle>,
}

/// Sorted distinct non-empty values of `facet` across the dataset.
pub fn distinct_values(sites: &[SiteRecord], facet: Facet) -> Vec<String> {
    sites
        .iter()
        .filter_map(|s| facet.value_of(s))
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// `region-east-africa` style identifier for a toggle.
pub fn toggle_id(facet: Facet, value: &str) -> String {
    let slug = value.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase();
    format!("{}-{}", facet.key(), slug)
}

/// Filter checkboxes for all facets plus a keyboard cursor.
///
/// Built once after the dataset loads. Toggling keeps the checkbox and the
/// [`FilterState`] selection in step; callers re-render afterwards.
#[derive(Debug, Clone, Default)]
pub struct FilterControls {
    groups: Vec<ToggleGroup>,
    cursor: usize,
}

impl FilterControls {
    pub fn build(sites: &[SiteRecord]) -> Self {
        let groups = Facet::ALL
            .iter()
            .map(|&facet| ToggleGroup {
                facet,
                toggles: distinct_values(sites, facet)
                    .into_iter()
                    .map(|value| Toggle {
                        id: toggle_id(facet, &value),
                        value,
                        checked: false,
                    })
                    .collect(),
            })
            .collect();

        Self { groups, cursor: 0 }
    }

    pub fn groups(&self) -> &[ToggleGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.toggles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_next(&mut self) {
        if !self.is_empty() {
            self.cursor = (self.cursor + 1) % self.len();
        }
    }

    pub fn cursor_prev(&mut self) {
        if !self.is_empty() {
            self.cursor = (self.cursor + self.len() - 1) % self.len();
        }
    }

    /// Facet and toggle under a flat index.
    pub fn get(&self, index: usize) -> Option<(Facet, &Toggle)> {
        let mut remaining = index;
        for group in &self.groups {
            if remaining < group.toggles.len() {
                return Some((group.facet, &group.toggles[remaining]));
            }
            remaining -= group.toggles.len();
        }
        None
    }

    fn get_mut(&mut self, index: usize) -> Option<(Facet, &mut Toggle)> {
        let mut remaining = index;
        for group in &mut self.groups {
            if remaining < group.toggles.len() {
                return Some((group.facet, &mut group.toggles[remaining]));
            }
            remaining -= group.toggles.len();
        }
        None
    }

    /// Flip the toggle at `index` and mirror it into `state`.
    /// Returns false when the index is out of range.
    pub fn toggle(&mut self, index: usize, state: &mut FilterState) -> bool {
        let Some((facet, toggle)) = self.get_mut(index) else {
            return false;
        };
        toggle.checked = !toggle.checked;
        if toggle.checked {
            state.select(facet, &toggle.value);
        } else {
            state.deselect(facet, &toggle.value);
        }
        tracing::debug!(id = %toggle.id, checked = toggle.checked, "filter toggled");
        true
    }

    pub fn toggle_at_cursor(&mut self, state: &mut FilterState) -> bool {
        self.toggle(self.cursor, state)
    }

    /// Uncheck everything and clear the filter state.
    pub fn reset(&mut self, state: &mut FilterState) {
        self.groups
            .iter_mut()
            .flat_map(|g| g.toggles.iter_mut())
            .for_each(|t| t.checked = false);
        state.clear();
    }
}
