//! The story wizard: step configuration, paged forms, and resume logic.
//!
//! A story is filled in across ordered steps (`intro`, `section-a`,
//! `section-b`, `section-c`, `complete`), each chunked into pages. This
//! module knows the step table, drives a [`SectionForm`] through one step's
//! pages with skip-aware navigation, and computes where a returning user
//! left off and how far along they are.

/// Form state and page navigation inside a step.
pub mod form;
/// Resume position and completion percentage.
pub mod progress;
/// The static step table.
pub mod steps;
/// Step-to-step ordering.
pub mod workflow;

pub use form::{
    delta, is_truthy, nullify_fields, num_checked, Advance, Retreat, SectionForm, StoryForm,
    ToggleMap,
};
pub use progress::{calculate_progress, find_last_position, LastPosition};
pub use steps::{get_step_config, step_order, StepConfig, STEP_CONFIGS};
pub use workflow::{prev_next_steps, StepNeighbors};
