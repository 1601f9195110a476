use crate::core::selection::SelectionModel;
use crate::domain::model::{GenerateResponse, PlanResponse, Row};
use crate::domain::ports::MarketplaceApi;
use crate::utils::error::{MarketplaceError, Result};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing submitted yet.
    Prompt,
    /// Waiting on the planner for `query`.
    Loading { query: String },
    /// Suggestions for the last successful query are on screen.
    Results,
}

/// The dataset-creation flow: query, suggestions, field selection,
/// preview, generation.
///
/// Submitting goes `Prompt -> Loading -> Results`. A failed plan puts the
/// view back where it was and keeps the previous results and selection.
pub struct CreateDatasetSession {
    api: Arc<dyn MarketplaceApi>,
    query: String,
    view: ViewState,
    view_before_submit: Option<ViewState>,
    plan: Option<PlanResponse>,
    selection: SelectionModel,
    preview: Option<Vec<Row>>,
    generated: Option<GenerateResponse>,
    last_error: Option<String>,
}

impl CreateDatasetSession {
    pub fn new(api: Arc<dyn MarketplaceApi>) -> Self {
        Self {
            api,
            query: String::new(),
            view: ViewState::Prompt,
            view_before_submit: None,
            plan: None,
            selection: SelectionModel::default(),
            preview: None,
            generated: None,
            last_error: None,
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn plan(&self) -> Option<&PlanResponse> {
        self.plan.as_ref()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionModel {
        &mut self.selection
    }

    pub fn preview_rows(&self) -> Option<&[Row]> {
        self.preview.as_deref()
    }

    pub fn generated(&self) -> Option<&GenerateResponse> {
        self.generated.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn estimated_users(&self) -> u64 {
        self.plan.as_ref().map_or(0, |p| p.estimated_users)
    }

    /// Enters `Loading` and returns the trimmed query, or `None` for a blank one.
    pub fn begin_submit(&mut self) -> Option<String> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return None;
        }
        let previous = std::mem::replace(
            &mut self.view,
            ViewState::Loading {
                query: query.clone(),
            },
        );
        // A submit issued while loading restores to whatever preceded the first one.
        if !matches!(previous, ViewState::Loading { .. }) {
            self.view_before_submit = Some(previous);
        }
        Some(query)
    }

    /// Applies the planner's answer to a submission started with [`begin_submit`].
    ///
    /// [`begin_submit`]: Self::begin_submit
    pub fn complete_submit(&mut self, outcome: Result<PlanResponse>) -> Result<()> {
        let previous = self.view_before_submit.take().unwrap_or(ViewState::Prompt);
        match outcome {
            Ok(plan) => {
                tracing::info!(
                    "Planner suggested {} sources across {:?}",
                    plan.sources.len(),
                    plan.detected_domains
                );
                self.selection = SelectionModel::new(plan.sources.clone());
                self.plan = Some(plan);
                self.preview = None;
                self.generated = None;
                self.last_error = None;
                self.view = ViewState::Results;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Query submission failed: {}", e);
                self.view = previous;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Sends the current query to the planner.
    ///
    /// Returns `Ok(false)` when the query is blank and nothing happened.
    pub async fn submit(&mut self) -> Result<bool> {
        let Some(query) = self.begin_submit() else {
            return Ok(false);
        };
        tracing::debug!("Submitting query: {}", query);
        let outcome = self.api.plan_query(&query).await;
        self.complete_submit(outcome)?;
        Ok(true)
    }

    pub fn toggle_field(&mut self, source_id: &str, field_name: &str) -> bool {
        self.selection.toggle_field(source_id, field_name)
    }

    pub async fn preview(&mut self, dataset_id: &str) -> Result<&[Row]> {
        self.require_selection()?;
        let preview = self.api.preview_dataset(dataset_id).await?;
        tracing::debug!("Preview returned {} rows", preview.sample.len());
        Ok(self.preview.insert(preview.sample).as_slice())
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    pub async fn generate(&mut self, dataset_id: &str) -> Result<&GenerateResponse> {
        self.require_selection()?;
        let request = self.selection.generate_request(dataset_id);
        let response = self.api.generate_dataset(&request).await?;
        tracing::info!("Stream {} available at {}", response.dataset_id, response.endpoint);
        self.preview = None;
        Ok(self.generated.insert(response))
    }

    fn require_selection(&self) -> Result<()> {
        if self.view != ViewState::Results || self.selection.selected_field_count() == 0 {
            return Err(MarketplaceError::EmptySelection);
        }
        Ok(())
    }
}
