//! Step-to-step navigation order.

use crate::models::StepId;

/// Neighboring steps for cross-step navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepNeighbors {
    pub previous: Option<StepId>,
    pub next: Option<StepId>,
}

/// Navigation neighbors for `step_id`.
///
/// A static table rather than list arithmetic: the terminal `complete` step
/// and unknown ids are dead ends with no neighbors, not errors.
pub fn prev_next_steps(step_id: &str) -> StepNeighbors {
    let (previous, next) = match step_id {
        "intro" => (None, Some(StepId::SectionA)),
        "section-a" => (Some(StepId::Intro), Some(StepId::SectionB)),
        "section-b" => (Some(StepId::SectionA), Some(StepId::SectionC)),
        "section-c" => (Some(StepId::SectionB), None),
        _ => (None, None),
    };
    StepNeighbors { previous, next }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_steps_have_both_neighbors() {
        assert_eq!(
            prev_next_steps("section-a"),
            StepNeighbors {
                previous: Some(StepId::Intro),
                next: Some(StepId::SectionB),
            }
        );
        assert_eq!(
            prev_next_steps("section-b"),
            StepNeighbors {
                previous: Some(StepId::SectionA),
                next: Some(StepId::SectionC),
            }
        );
    }

    #[test]
    fn the_edges_stop_navigation() {
        assert_eq!(prev_next_steps("intro").previous, None);
        assert_eq!(prev_next_steps("intro").next, Some(StepId::SectionA));
        assert_eq!(prev_next_steps("section-c").next, None);
    }

    #[test]
    fn unknown_and_terminal_steps_are_dead_ends() {
        for id in ["complete", "unknown", "", "section_a"] {
            let neighbors = prev_next_steps(id);
            assert_eq!(neighbors.previous, None);
            assert_eq!(neighbors.next, None);
        }
    }
}
