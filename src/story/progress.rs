//! Resume position and completion percentage for a project.

use serde_json::Value;

use crate::models::{Project, ProjectStatus, ResponseMap};

use super::steps::{get_step_config, step_order};

/// Where a returning user picks the wizard back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPosition {
    pub step: &'static str,
    pub page: u32,
}

/// A value counts once it holds anything other than null or the empty
/// string. `false` and `0` are deliberate answers and count.
fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Finds the last step and page holding saved data, scanning the wizard
/// from the end backwards. A project with no answers starts at intro
/// page 1.
pub fn find_last_position(project: &Project) -> LastPosition {
    for step in step_order().into_iter().rev() {
        let Some(step_data) = project.step_responses(step) else {
            continue;
        };
        if step_data.is_empty() {
            continue;
        }
        return LastPosition {
            step,
            page: find_last_page_in_step(step, step_data),
        };
    }

    LastPosition {
        step: "intro",
        page: 1,
    }
}

/// Highest page of `step` with at least one filled field, page 1 when the
/// stored keys all turn out blank.
fn find_last_page_in_step(step: &str, step_data: &ResponseMap) -> u32 {
    let config = get_step_config(step);
    for page in (1..=config.page_count()).rev() {
        let has_data = config
            .page_fields(page)
            .iter()
            .any(|field| step_data.get(*field).map_or(false, is_filled));
        if has_data {
            return page;
        }
    }
    1
}

/// Share of the wizard's fields holding an answer, rounded to the nearest
/// whole percent. Completed projects always report 100.
///
/// Filled values are counted over everything stored for a step, so a step
/// map carrying keys outside its configured fields can push the figure
/// past 100.
pub fn calculate_progress(project: &Project) -> u8 {
    if project.status == ProjectStatus::Completed {
        return 100;
    }

    let mut total_fields = 0usize;
    let mut filled_fields = 0usize;
    for step in step_order() {
        total_fields += get_step_config(step).fields.len();
        if let Some(step_data) = project.step_responses(step) {
            filled_fields += step_data.values().filter(|value| is_filled(value)).count();
        }
    }

    if total_fields == 0 {
        return 0;
    }
    ((filled_fields as f64 / total_fields as f64) * 100.0).round() as u8
}
