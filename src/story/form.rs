//! Form state and paged navigation within a step.
//!
//! [`StoryForm`] is an explicit composite of the field values being edited
//! plus the bookkeeping a shell reads (error map, processing flag,
//! recently-successful flag). [`SectionForm`] drives it through a step's
//! pages: saving answers through the data source, skipping toggle-gated
//! pages, and reporting when navigation crosses a step boundary.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::datasource::DataSourceHandle;
use crate::errors::EngineError;
use crate::models::{Project, ResponseMap, StepId};

use super::steps::get_step_config;
use super::workflow::{prev_next_steps, StepNeighbors};

/// Skip registry: page number → (checkbox field → dependent field).
///
/// When every checkbox on a registered page is falsy, the following page is
/// skipped and each dependent field is nulled.
pub type ToggleMap = BTreeMap<u32, BTreeMap<String, String>>;

/// Truthiness for stored answers: null, `false`, `0` and `""` are falsy,
/// everything else (including missing-field `None`) follows the stored
/// value. Missing fields are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Number of `fields` holding a truthy value in `data`.
pub fn num_checked<'a>(data: &ResponseMap, fields: impl IntoIterator<Item = &'a str>) -> usize {
    fields
        .into_iter()
        .filter(|field| is_truthy(data.get(*field)))
        .count()
}

/// Pages advanced past `page`: 2 when `page` is a registered toggle page
/// with no checkbox checked (the dependent page is skipped), otherwise 1.
pub fn delta(page: u32, data: &ResponseMap, toggled: &ToggleMap) -> u32 {
    match toggled.get(&page) {
        Some(checks) if num_checked(data, checks.keys().map(String::as_str)) == 0 => 2,
        _ => 1,
    }
}

/// Nulls each dependent field on `page` whose checkbox is falsy, so fields
/// behind a skipped page never keep stale values. Other fields are
/// untouched.
pub fn nullify_fields(data: &mut ResponseMap, toggled: &ToggleMap, page: u32) {
    if let Some(checks) = toggled.get(&page) {
        for (checkbox, dependent) in checks {
            if !is_truthy(data.get(checkbox)) {
                data.insert(dependent.clone(), Value::Null);
            }
        }
    }
}

/// One step's answers while being edited, with save bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct StoryForm {
    data: ResponseMap,
    initial: ResponseMap,
    errors: BTreeMap<String, String>,
    processing: bool,
    recently_successful: bool,
}

impl StoryForm {
    pub fn new(initial: ResponseMap) -> Self {
        Self {
            data: initial.clone(),
            initial,
            ..Default::default()
        }
    }

    pub fn data(&self) -> &ResponseMap {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.data.insert(field.to_string(), value);
    }

    /// Restores every field to its initial value.
    pub fn reset(&mut self) {
        self.data = self.initial.clone();
    }

    /// Restores the named fields to their initial values; fields that had no
    /// initial value are cleared.
    pub fn reset_fields(&mut self, fields: &[&str]) {
        for field in fields {
            match self.initial.get(*field) {
                Some(value) => {
                    self.data.insert((*field).to_string(), value.clone());
                }
                None => {
                    self.data.remove(*field);
                }
            }
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn set_error(&mut self, field: &str, message: &str) {
        self.errors.insert(field.to_string(), message.to_string());
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn clear_field_errors(&mut self, fields: &[&str]) {
        for field in fields {
            self.errors.remove(*field);
        }
    }

    pub fn processing(&self) -> bool {
        self.processing
    }

    pub fn recently_successful(&self) -> bool {
        self.recently_successful
    }
}

/// Where [`SectionForm::save_and_advance`] leaves the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Still inside this step, now on the contained page.
    Page(u32),
    /// Past the last page; the step is done and the wizard moves on.
    StepComplete { next: Option<StepId> },
}

/// Where [`SectionForm::go_back`] leaves the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retreat {
    Page(u32),
    /// Backed out of page 1 into the configured page of the previous step.
    PreviousStep { step: Option<StepId>, page: u32 },
}

/// Paged navigation over one step's form.
///
/// Mirrors the wizard's two buttons: `save_and_advance` persists the
/// current answers and moves forward, `go_back` moves backward without
/// saving. Both report where the caller should take the user next.
pub struct SectionForm {
    source: DataSourceHandle,
    project_id: String,
    step: String,
    neighbors: StepNeighbors,
    form: StoryForm,
    current: u32,
    previous: u32,
    pages: u32,
    toggled: ToggleMap,
    previous_step_page: Option<u32>,
}

impl SectionForm {
    /// Opens `step` of `project` at the 1-based `page`, pre-filling the form
    /// from the project's saved responses for that step.
    pub fn new(source: DataSourceHandle, project: &Project, step: &str, page: u32) -> Self {
        let config = get_step_config(step);
        let initial = project.step_responses(step).cloned().unwrap_or_default();
        Self {
            source,
            project_id: project.id.clone(),
            step: step.to_string(),
            neighbors: prev_next_steps(step),
            form: StoryForm::new(initial),
            current: page,
            previous: page.saturating_sub(1),
            pages: config.page_count(),
            toggled: ToggleMap::new(),
            previous_step_page: None,
        }
    }

    /// Registers the checkbox → dependent-field pairs per page; unchecked
    /// checkboxes skip the following page and null their dependents.
    pub fn with_toggled(mut self, toggled: ToggleMap) -> Self {
        self.toggled = toggled;
        self
    }

    /// Page of the previous step to land on when backing out of page 1.
    /// Without it, backing out of page 1 stays inside this step.
    pub fn with_previous_step_page(mut self, page: u32) -> Self {
        self.previous_step_page = Some(page);
        self
    }

    pub fn form(&self) -> &StoryForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut StoryForm {
        &mut self.form
    }

    pub fn current_page(&self) -> u32 {
        self.current
    }

    pub fn previous_page(&self) -> u32 {
        self.previous
    }

    pub fn page_count(&self) -> u32 {
        self.pages
    }

    pub fn neighbors(&self) -> StepNeighbors {
        self.neighbors
    }

    /// Nulls skipped dependents, persists the whole step's answers through
    /// the data source, then advances past the current page by the
    /// skip-aware delta. Failures leave the page where it was.
    pub async fn save_and_advance(&mut self) -> Result<Advance, EngineError> {
        nullify_fields(&mut self.form.data, &self.toggled, self.current);

        self.form.processing = true;
        self.form.errors.clear();
        self.form.recently_successful = false;

        let outcome = self
            .source
            .save_responses(&self.project_id, &self.step, self.form.data.clone())
            .await;
        self.form.processing = false;
        outcome?;
        self.form.recently_successful = true;

        self.current += delta(self.current, &self.form.data, &self.toggled);
        self.previous = self.current - 1;

        if self.current > self.pages {
            Ok(Advance::StepComplete {
                next: self.neighbors.next,
            })
        } else {
            Ok(Advance::Page(self.current))
        }
    }

    /// Moves backward without saving. With a configured previous-step page,
    /// backing out of page 1 crosses into the previous step; the skip delta
    /// is probed two pages back so a page skipped forward is skipped again
    /// in reverse.
    pub fn go_back(&mut self) -> Retreat {
        if let Some(previous_step_page) = self.previous_step_page {
            let probe = self.current.saturating_sub(2);
            let step_back = delta(probe, &self.form.data, &self.toggled);

            if self.current <= step_back {
                self.current = 0;
                self.previous = 1;
                return Retreat::PreviousStep {
                    step: self.neighbors.previous,
                    page: previous_step_page,
                };
            }

            self.current -= step_back;
            self.previous = self.current - 1;
            Retreat::Page(self.current)
        } else {
            let step_back = delta(self.current, &self.form.data, &self.toggled);
            self.current = self.current.saturating_sub(step_back);
            self.previous = self.current.saturating_sub(1);
            Retreat::Page(self.current)
        }
    }
}
