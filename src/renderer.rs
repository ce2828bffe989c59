//! Template rendering for kiln.
//! Names and file contents go through the same MiniJinja environment so both
//! see identical semantics.
use cruet::Inflector;
use minijinja::Environment;

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `context` - Context variables for rendering
    ///
    /// # Errors
    /// Returns the engine error for malformed syntax or a failing expression.
    fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<String, minijinja::Error>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer with the case-conversion filters registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Rendered files must match their sources byte for byte.
        env.set_keep_trailing_newline(true);
        env.add_filter("snake_case", |value: String| value.to_snake_case());
        env.add_filter("kebab_case", |value: String| value.to_kebab_case());
        env.add_filter("camel_case", |value: String| value.to_camel_case());
        env.add_filter("pascal_case", |value: String| value.to_pascal_case());
        env.add_filter("screaming_snake_case", |value: String| {
            value.to_screaming_snake_case()
        });
        Self { env }
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        MiniJinjaRenderer::new()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<String, minijinja::Error> {
        self.env.render_str(template, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_filters() {
        let engine = MiniJinjaRenderer::new();
        let context = json!({"Values": {"name": "my project"}});

        assert_eq!(
            engine.render("{{ Values.name | snake_case }}", &context).unwrap(),
            "my_project"
        );
        assert_eq!(
            engine.render("{{ Values.name | kebab_case }}", &context).unwrap(),
            "my-project"
        );
        assert_eq!(
            engine.render("{{ Values.name | pascal_case }}", &context).unwrap(),
            "MyProject"
        );
    }

    #[test]
    fn test_trailing_newline_kept() {
        let engine = MiniJinjaRenderer::new();
        let rendered = engine.render("line\n", &json!({})).unwrap();
        assert_eq!(rendered, "line\n");
    }
}
