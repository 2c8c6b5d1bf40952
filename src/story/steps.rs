//! Static step configuration for the story wizard.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

/// One wizard step: its ordered fields and how they chunk into pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    pub id: &'static str,
    pub slug: &'static str,
    pub name: &'static str,
    /// Field names in display order.
    pub fields: &'static [&'static str],
    /// Page chunk size; 0 means the step has no user-editable fields.
    pub fields_per_page: u32,
}

impl StepConfig {
    /// Number of pages; the last page may be a partial chunk.
    pub fn page_count(&self) -> u32 {
        if self.fields_per_page == 0 {
            return 0;
        }
        (self.fields.len() as u32).div_ceil(self.fields_per_page)
    }

    /// Fields shown on 1-based `page`; empty outside the step's range.
    pub fn page_fields(&self, page: u32) -> &'static [&'static str] {
        if page == 0 || self.fields_per_page == 0 {
            return &[];
        }
        let start = ((page - 1) * self.fields_per_page) as usize;
        if start >= self.fields.len() {
            return &[];
        }
        let end = (start + self.fields_per_page as usize).min(self.fields.len());
        &self.fields[start..end]
    }
}

lazy_static! {
    /// Step configuration table, keyed by step id.
    pub static ref STEP_CONFIGS: BTreeMap<&'static str, StepConfig> = {
        let mut configs = BTreeMap::new();
        configs.insert(
            "intro",
            StepConfig {
                id: "intro",
                slug: "intro",
                name: "Introduction",
                fields: &["intro_1", "intro_2", "intro_3"],
                fields_per_page: 3,
            },
        );
        configs.insert(
            "section-a",
            StepConfig {
                id: "section-a",
                slug: "section-a",
                name: "Section A",
                fields: &[
                    "section_a_1",
                    "section_a_2",
                    "section_a_3",
                    "section_a_4",
                    "section_a_5",
                    "section_a_6",
                ],
                fields_per_page: 3,
            },
        );
        configs.insert(
            "section-b",
            StepConfig {
                id: "section-b",
                slug: "section-b",
                name: "Section B",
                fields: &[
                    "section_b_1",
                    "section_b_2",
                    "section_b_3",
                    "section_b_4",
                    "section_b_5",
                    "section_b_6",
                    "section_b_7",
                    "section_b_8",
                    "section_b_9",
                ],
                fields_per_page: 3,
            },
        );
        configs.insert(
            "section-c",
            StepConfig {
                id: "section-c",
                slug: "section-c",
                name: "Section C",
                fields: &[
                    "section_c_1",
                    "section_c_2",
                    "section_c_3",
                    "section_c_4",
                    "section_c_5",
                    "section_c_6",
                    "section_c_7",
                    "section_c_8",
                    "section_c_9",
                ],
                fields_per_page: 1,
            },
        );
        configs.insert(
            "complete",
            StepConfig {
                id: "complete",
                slug: "complete",
                name: "Complete",
                fields: &[],
                fields_per_page: 0,
            },
        );
        configs
    };
}

/// Configuration for `step_id`, defaulting to intro for unknown ids.
pub fn get_step_config(step_id: &str) -> &'static StepConfig {
    match STEP_CONFIGS.get(step_id) {
        Some(config) => config,
        None => {
            log::warn!("Step config not found for: {step_id}, defaulting to intro");
            &STEP_CONFIGS["intro"]
        }
    }
}

/// The steps a user fills in, in order. The terminal `complete` step carries
/// no fields and is excluded.
pub fn step_order() -> [&'static str; 4] {
    ["intro", "section-a", "section-b", "section-c"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_step_with_expected_shapes() {
        let ids: Vec<&str> = STEP_CONFIGS.keys().copied().collect();
        assert!(ids.contains(&"intro"));
        assert!(ids.contains(&"section-a"));
        assert!(ids.contains(&"section-b"));
        assert!(ids.contains(&"section-c"));
        assert!(ids.contains(&"complete"));
        assert_eq!(ids.len(), 5);

        assert_eq!(STEP_CONFIGS["intro"].fields.len(), 3);
        assert_eq!(STEP_CONFIGS["intro"].fields_per_page, 3);
        assert_eq!(STEP_CONFIGS["section-a"].fields.len(), 6);
        assert_eq!(STEP_CONFIGS["section-b"].fields.len(), 9);
        assert_eq!(STEP_CONFIGS["section-c"].fields.len(), 9);
        assert_eq!(STEP_CONFIGS["section-c"].fields_per_page, 1);
        assert_eq!(STEP_CONFIGS["complete"].fields.len(), 0);
        assert_eq!(STEP_CONFIGS["complete"].fields_per_page, 0);
    }

    #[test]
    fn unknown_ids_fall_back_to_intro() {
        assert_eq!(get_step_config("intro").name, "Introduction");
        assert_eq!(get_step_config("nonexistent").id, "intro");
    }

    #[test]
    fn pages_chunk_fields_with_a_partial_tail() {
        let config = StepConfig {
            id: "x",
            slug: "x",
            name: "X",
            fields: &["f1", "f2", "f3", "f4", "f5"],
            fields_per_page: 3,
        };
        assert_eq!(config.page_count(), 2);
        assert_eq!(config.page_fields(1), &["f1", "f2", "f3"]);
        // last page is a partial chunk
        assert_eq!(config.page_fields(2), &["f4", "f5"]);
        assert!(config.page_fields(3).is_empty());
        assert!(config.page_fields(0).is_empty());

        assert_eq!(STEP_CONFIGS["section-a"].page_count(), 2);
        assert_eq!(STEP_CONFIGS["section-b"].page_count(), 3);
        assert_eq!(STEP_CONFIGS["section-c"].page_count(), 9);
        assert_eq!(STEP_CONFIGS["complete"].page_count(), 0);
    }

    #[test]
    fn step_order_excludes_the_terminal_step() {
        assert_eq!(
            step_order(),
            ["intro", "section-a", "section-b", "section-c"]
        );
    }
}
