use crate::domain::model::{GenerateRequest, Source};
use std::collections::{BTreeMap, BTreeSet};

/// Days billed per month in cost estimates.
pub const BILLING_DAYS_PER_MONTH: f64 = 30.0;

/// Field selection over a fixed set of sources.
///
/// A source is tracked only while at least one of its fields is selected,
/// and every tracked field name exists on its source. `selected_sources`
/// keeps the order in which sources first gained a field.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    sources: Vec<Source>,
    selected: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
}

impl SelectionModel {
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            sources,
            selected: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source(&self, source_id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == source_id)
    }

    /// Flips `field_name` for `source_id` and returns whether it is now selected.
    ///
    /// Unknown sources and fields are ignored.
    pub fn toggle_field(&mut self, source_id: &str, field_name: &str) -> bool {
        let known = self
            .source(source_id)
            .map(|s| s.has_field(field_name))
            .unwrap_or(false);
        if !known {
            tracing::debug!("Ignoring toggle of unknown field {}.{}", source_id, field_name);
            return false;
        }

        if self.remove_field(source_id, field_name) {
            false
        } else {
            self.insert_field(source_id, field_name);
            true
        }
    }

    pub fn select_all(&mut self, source_id: &str) {
        let Some(source) = self.source(source_id) else {
            return;
        };
        let names: Vec<String> = source.fields.iter().map(|f| f.name.clone()).collect();
        for name in names {
            self.insert_field(source_id, &name);
        }
    }

    pub fn deselect_all(&mut self, source_id: &str) {
        if self.selected.remove(source_id).is_some() {
            self.order.retain(|id| id != source_id);
        }
    }

    /// Deselects everything when the source is fully selected, selects the rest otherwise.
    pub fn toggle_all(&mut self, source_id: &str) {
        if self.is_source_fully_selected(source_id) {
            self.deselect_all(source_id);
        } else {
            self.select_all(source_id);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.order.clear();
    }

    pub fn is_field_selected(&self, source_id: &str, field_name: &str) -> bool {
        self.selected
            .get(source_id)
            .map(|fields| fields.contains(field_name))
            .unwrap_or(false)
    }

    pub fn selected_fields(&self, source_id: &str) -> Option<&BTreeSet<String>> {
        self.selected.get(source_id)
    }

    pub fn selected_sources(&self) -> &[String] {
        &self.order
    }

    pub fn selected_field_count(&self) -> usize {
        self.selected.values().map(BTreeSet::len).sum()
    }

    pub fn is_source_fully_selected(&self, source_id: &str) -> bool {
        match (self.source(source_id), self.selected.get(source_id)) {
            (Some(source), Some(fields)) => fields.len() == source.fields.len(),
            _ => false,
        }
    }

    /// Monthly cost of the current selection.
    ///
    /// Each source contributes its daily per-user price scaled by the share
    /// of its fields that are selected, its audience, and a 30-day month.
    pub fn estimated_cost(&self) -> f64 {
        self.order
            .iter()
            .filter_map(|id| {
                let source = self.source(id)?;
                let selected = self.selected.get(id)?.len();
                let ratio = selected as f64 / source.fields.len() as f64;
                Some(
                    source.price_per_user_day
                        * ratio
                        * source.estimated_users as f64
                        * BILLING_DAYS_PER_MONTH,
                )
            })
            .fold(0.0, |total, cost| total + cost)
    }

    /// Cost per user for the summary line; zero for an empty audience.
    pub fn cost_per_user(&self, estimated_users: u64) -> f64 {
        if estimated_users == 0 {
            0.0
        } else {
            self.estimated_cost() / estimated_users as f64
        }
    }

    pub fn generate_request(&self, dataset_id: &str) -> GenerateRequest {
        GenerateRequest {
            dataset_id: dataset_id.to_string(),
            selected_sources: self.order.clone(),
            selected_fields: self
                .selected
                .iter()
                .map(|(id, fields)| (id.clone(), fields.iter().cloned().collect()))
                .collect(),
        }
    }

    fn insert_field(&mut self, source_id: &str, field_name: &str) {
        let fields = self.selected.entry(source_id.to_string()).or_default();
        if fields.is_empty() {
            self.order.push(source_id.to_string());
        }
        fields.insert(field_name.to_string());
    }

    fn remove_field(&mut self, source_id: &str, field_name: &str) -> bool {
        let Some(fields) = self.selected.get_mut(source_id) else {
            return false;
        };
        if !fields.remove(field_name) {
            return false;
        }
        if fields.is_empty() {
            self.deselect_all(source_id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Field, Freshness};

    fn source(id: &str, fields: &[&str], price: f64, users: u64) -> Source {
        Source {
            id: id.to_string(),
            name: id.to_uppercase(),
            domain: "education".to_string(),
            description: String::new(),
            estimated_users: users,
            freshness: Freshness::Daily,
            price_per_user_day: price,
            fields: fields.iter().map(|f| Field::named(*f)).collect(),
        }
    }

    fn model() -> SelectionModel {
        SelectionModel::new(vec![
            source("a", &["x", "y"], 0.01, 100),
            source("b", &["p", "q", "r"], 0.02, 50),
        ])
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_cost_scales_with_selected_share() {
        let mut model = model();

        assert!(model.toggle_field("a", "x"));
        assert_close(model.estimated_cost(), 15.0);

        assert!(model.toggle_field("a", "y"));
        assert_close(model.estimated_cost(), 30.0);
    }

    #[test]
    fn test_empty_selection_costs_nothing() {
        let model = model();
        assert_eq!(model.estimated_cost(), 0.0);
        assert_eq!(model.selected_field_count(), 0);
        assert!(model.selected_sources().is_empty());
    }

    #[test]
    fn test_last_field_removes_source() {
        let mut model = model();
        model.toggle_field("b", "p");
        model.toggle_field("a", "x");
        assert_eq!(model.selected_sources(), ["b", "a"]);

        assert!(!model.toggle_field("b", "p"));
        assert_eq!(model.selected_sources(), ["a"]);
        assert!(model.selected_fields("b").is_none());
    }

    #[test]
    fn test_unknown_toggles_are_ignored() {
        let mut model = model();
        assert!(!model.toggle_field("missing", "x"));
        assert!(!model.toggle_field("a", "nope"));
        assert_eq!(model.selected_field_count(), 0);
        assert!(model.selected_sources().is_empty());
    }

    #[test]
    fn test_select_all_then_deselect_all() {
        let mut model = model();
        model.toggle_field("b", "q");

        model.toggle_all("b");
        assert!(model.is_source_fully_selected("b"));
        assert_eq!(model.selected_field_count(), 3);
        assert_eq!(model.selected_sources(), ["b"]);

        model.toggle_all("b");
        assert!(!model.is_source_fully_selected("b"));
        assert!(model.selected_fields("b").is_none());
        assert!(model.selected_sources().is_empty());
    }

    #[test]
    fn test_source_without_fields_is_never_fully_selected() {
        let mut model = SelectionModel::new(vec![source("empty", &[], 0.01, 10)]);
        model.select_all("empty");
        assert!(!model.is_source_fully_selected("empty"));
        assert!(model.selected_sources().is_empty());
        assert_eq!(model.estimated_cost(), 0.0);
    }

    #[test]
    fn test_generate_request_carries_selection() {
        let mut model = model();
        model.toggle_field("b", "r");
        model.toggle_field("b", "p");
        model.toggle_field("a", "y");

        let request = model.generate_request("duo_airbnb_italian");
        assert_eq!(request.dataset_id, "duo_airbnb_italian");
        assert_eq!(request.selected_sources, vec!["b", "a"]);
        assert_eq!(request.selected_fields["b"], vec!["p", "r"]);
        assert_eq!(request.selected_fields["a"], vec!["y"]);
    }

    #[test]
    fn test_cost_per_user() {
        let mut model = model();
        model.select_all("a");
        assert_close(model.cost_per_user(100), 0.3);
        assert_eq!(model.cost_per_user(0), 0.0);
    }
}
