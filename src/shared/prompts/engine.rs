use minijinja::{Environment, Value};
use std::sync::OnceLock;
use thiserror::Error;

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

const TEMPLATES: &[(&str, &str)] = &[
    (
        "comparisons/classify_item.jinja",
        include_str!("../../../templates/prompts/comparisons/classify_item.jinja"),
    ),
    (
        "comparisons/summary.jinja",
        include_str!("../../../templates/prompts/comparisons/summary.jinja"),
    ),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load template {}: {}", name, e);
        }
    }
    env
}

fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a bundled template by its path under `templates/prompts/`
pub fn render_template(template_name: &str, ctx: Value) -> Result<String, TemplateError> {
    let template = get_environment()
        .get_template(template_name)
        .map_err(|_| TemplateError::NotFound(template_name.to_string()))?;

    template
        .render(ctx)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_missing_template() {
        let result = render_template("nonexistent.jinja", context! {});
        assert!(matches!(result, Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_bundled_templates_load() {
        for (name, _) in TEMPLATES {
            assert!(get_environment().get_template(name).is_ok(), "{}", name);
        }
    }
}
