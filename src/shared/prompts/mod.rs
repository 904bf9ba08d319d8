//! Prompt and report-text templates (Jinja syntax via `minijinja`).
//!
//! Templates live in `templates/prompts/` and are compiled into the binary.

mod engine;

pub use engine::{render_template, TemplateError};

use minijinja::{context, Value};

/// Prompt for classifying one item's change between entry and exit
pub struct ClassifyItemPrompt<'a> {
    pub room_name: &'a str,
    pub item_name: &'a str,
    pub entry_condition: Option<String>,
    pub exit_condition: String,
    pub entry_notes: Option<&'a str>,
    pub exit_notes: Option<&'a str>,
    pub entry_image_count: usize,
    pub exit_image_count: usize,
    pub json_schema: &'a str,
}

pub fn render_classify_item_prompt(prompt: &ClassifyItemPrompt<'_>) -> Result<String, TemplateError> {
    render_template(
        "comparisons/classify_item.jinja",
        context! {
            room_name => prompt.room_name,
            item_name => prompt.item_name,
            entry_condition => prompt.entry_condition,
            exit_condition => prompt.exit_condition,
            entry_notes => prompt.entry_notes,
            exit_notes => prompt.exit_notes,
            entry_image_count => prompt.entry_image_count,
            exit_image_count => prompt.exit_image_count,
            json_schema => prompt.json_schema,
        },
    )
}

/// Human-readable comparison summary; `ctx` carries the aggregates and `top_issues`
pub fn render_comparison_summary(ctx: Value) -> Result<String, TemplateError> {
    render_template("comparisons/summary.jinja", ctx).map(|s| s.trim().to_string())
}
