//! Prompt Catalog (C7): role/intent-indexed templates with variable
//! substitution, and the plan-shape validator.

mod validator;

pub use validator::validate_plan_shape;

use std::collections::HashMap;

use crate::error::{CascadeError, CascadeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Planner,
    Critic,
    Executor,
    Refinement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Debug,
    Generate,
    Explain,
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub user_template: String,
}

/// Substitute `{{var}}` markers in `template` from `vars`. Fails loudly if
/// a referenced variable is missing.
pub fn format(template: &str, vars: &HashMap<String, String>) -> CascadeResult<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_start = &rest[start + 2..];
        let Some(end) = after_start.find("}}") else {
            return Err(CascadeError::Shape(format!("unterminated template marker in: {template}")));
        };
        let var_name = after_start[..end].trim();
        let value = vars
            .get(var_name)
            .ok_or_else(|| CascadeError::Shape(format!("missing template variable: {var_name}")))?;
        output.push_str(value);
        rest = &after_start[end + 2..];
    }
    output.push_str(rest);
    Ok(output)
}

pub struct PromptCatalog {
    templates: HashMap<(Role, Intent), PromptConfig>,
    role_defaults: HashMap<Role, PromptConfig>,
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl PromptCatalog {
    pub fn new() -> Self {
        Self { templates: HashMap::new(), role_defaults: HashMap::new() }
    }

    pub fn register(&mut self, role: Role, intent: Intent, config: PromptConfig) {
        self.templates.insert((role, intent), config);
    }

    pub fn register_role_default(&mut self, role: Role, config: PromptConfig) {
        self.role_defaults.insert(role, config);
    }

    pub fn get(&self, role: Role, intent: Option<Intent>) -> Option<&PromptConfig> {
        if let Some(intent) = intent {
            if let Some(config) = self.templates.get(&(role, intent)) {
                return Some(config);
            }
        }
        self.role_defaults.get(&role)
    }

    /// A reasonable built-in catalog covering the three orchestrator roles.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.register_role_default(
            Role::Planner,
            PromptConfig {
                temperature: 0.3,
                max_tokens: 1024,
                system_prompt: "You produce a JSON execution plan for the given request.".into(),
                user_template: "Request: {{request}}\nContext: {{context}}\nCascade analysis:\n{{cascade}}".into(),
            },
        );
        catalog.register_role_default(
            Role::Critic,
            PromptConfig {
                temperature: 0.2,
                max_tokens: 768,
                system_prompt: "You critique a JSON execution plan and report a risk score.".into(),
                user_template: "Plan: {{plan}}".into(),
            },
        );
        catalog.register_role_default(
            Role::Executor,
            PromptConfig {
                temperature: 0.4,
                max_tokens: 2048,
                system_prompt: "You execute the accepted plan and return the result.".into(),
                user_template: "Plan: {{plan}}\nAdditional context: {{additional_context}}".into(),
            },
        );
        catalog.register_role_default(
            Role::Refinement,
            PromptConfig {
                temperature: 0.3,
                max_tokens: 1024,
                system_prompt: "You revise the plan to address the critique.".into(),
                user_template: "Plan: {{plan}}\nCritique: {{critique}}".into(),
            },
        );
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_substitutes_known_vars() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "world".to_string());
        let output = format("hello {{name}}", &vars).unwrap();
        assert_eq!(output, "hello world");
    }

    #[test]
    fn format_fails_on_missing_var() {
        let vars = HashMap::new();
        let result = format("hello {{name}}", &vars);
        assert!(result.is_err());
    }

    #[test]
    fn standard_catalog_has_all_roles() {
        let catalog = PromptCatalog::standard();
        assert!(catalog.get(Role::Planner, None).is_some());
        assert!(catalog.get(Role::Critic, None).is_some());
        assert!(catalog.get(Role::Executor, None).is_some());
        assert!(catalog.get(Role::Refinement, None).is_some());
    }
}
