//! Template rendering.
//!
//! Placeholders are `{ident}` where `ident` matches
//! `[a-zA-Z_][a-zA-Z0-9_]*`. Rendering is strict: every placeholder needs a
//! parameter, and *all* missing names are reported in one error. Extra
//! parameters are ignored.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{info, instrument};
use validator::Validate;

use chrono::{Duration, Utc};
use stockflow_core::{CoreError, CoreResult};
use stockflow_models::notifications::CreateTemplateDto;
use stockflow_models::{Notification, NotificationTemplate, TemplateId, UserId};
use stockflow_store::TemplateStore;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex"));
static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("ident regex"));

/// The non-failing validation report for a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    /// Placeholders not covered by the supplied parameters.
    pub missing_parameters: Vec<String>,
}

/// Pure placeholder substitution. No I/O, no stored state.
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// The placeholder names in a template string, in order of first
    /// appearance, without duplicates.
    pub fn placeholders(template: &str) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for capture in PLACEHOLDER_RE.captures_iter(template) {
            let name = &capture[1];
            if !IDENT_RE.is_match(name) {
                return Err(CoreError::InvalidTemplate(format!(
                    "invalid placeholder name '{{{name}}}'"
                )));
            }
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Substitutes every placeholder. Fails with the full sorted list of
    /// missing parameter names if any placeholder is uncovered.
    pub fn render(template: &str, params: &HashMap<String, String>) -> CoreResult<String> {
        let mut missing: Vec<String> = Self::placeholders(template)?
            .into_iter()
            .filter(|name| !params.contains_key(name))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(CoreError::MissingParameter(missing));
        }

        let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &regex::Captures<'_>| {
            params[&caps[1]].clone()
        });
        Ok(rendered.into_owned())
    }

    /// Renders a template's title and message together, reporting missing
    /// parameters across both in one error.
    pub fn render_pair(
        title_template: &str,
        message_template: &str,
        params: &HashMap<String, String>,
    ) -> CoreResult<(String, String)> {
        let mut missing: Vec<String> = Self::placeholders(title_template)?
            .into_iter()
            .chain(Self::placeholders(message_template)?)
            .filter(|name| !params.contains_key(name))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(CoreError::MissingParameter(missing));
        }

        Ok((
            Self::render(title_template, params)?,
            Self::render(message_template, params)?,
        ))
    }

    /// Checks a template string against a parameter set without failing.
    pub fn validate(template: &str, params: &HashMap<String, String>) -> TemplateValidation {
        let mut errors = Vec::new();
        let mut missing_parameters = Vec::new();

        for capture in PLACEHOLDER_RE.captures_iter(template) {
            let name = &capture[1];
            if !IDENT_RE.is_match(name) {
                errors.push(format!("invalid placeholder name '{{{name}}}'"));
            } else if !params.contains_key(name) && !missing_parameters.contains(&name.to_string())
            {
                missing_parameters.push(name.to_string());
            }
        }

        // Any brace left over after removing well-formed placeholders is
        // unbalanced.
        let stripped = PLACEHOLDER_RE.replace_all(template, "");
        if stripped.contains('{') || stripped.contains('}') {
            errors.push("unbalanced braces".to_string());
        }

        missing_parameters.sort();
        TemplateValidation {
            is_valid: errors.is_empty() && missing_parameters.is_empty(),
            errors,
            missing_parameters,
        }
    }
}

/// Template CRUD and instantiation over a [`TemplateStore`].
pub struct TemplateService {
    store: Arc<dyn TemplateStore>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    fn check_syntax(template: &str) -> CoreResult<()> {
        // Placeholder scan rejects bad names; the validation report catches
        // stray braces.
        TemplateRenderer::placeholders(template)?;
        let report = TemplateRenderer::validate(template, &HashMap::new());
        if let Some(error) = report.errors.first() {
            return Err(CoreError::InvalidTemplate(error.clone()));
        }
        Ok(())
    }

    /// Creates a template after validating name uniqueness and placeholder
    /// syntax in both the title and the message.
    #[instrument(skip(self, dto), fields(name = %dto.name))]
    pub async fn create(
        &self,
        dto: CreateTemplateDto,
        created_by: UserId,
    ) -> CoreResult<NotificationTemplate> {
        dto.validate()
            .map_err(|e| CoreError::validation(e.to_string()))?;
        Self::check_syntax(&dto.title_template)?;
        Self::check_syntax(&dto.message_template)?;

        let mut template = NotificationTemplate::new(
            dto.name,
            dto.title_template,
            dto.message_template,
            dto.notification_type,
            created_by,
        );
        template.description = dto.description;
        if let Some(priority) = dto.default_priority {
            template.default_priority = priority;
        }
        if let Some(channels) = dto.default_channels {
            template.default_channels = channels;
        }
        template.default_action_url = dto.default_action_url;
        template.expiration_hours = dto.expiration_hours;

        let created = self.store.insert_template(template).await?;
        info!(template = %created.name, "template created");
        Ok(created)
    }

    pub async fn get(&self, id: TemplateId) -> CoreResult<NotificationTemplate> {
        self.store
            .get_template(id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("template {id}")))
    }

    pub async fn get_by_name(&self, name: &str) -> CoreResult<NotificationTemplate> {
        self.store
            .get_template_by_name(name)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("template '{name}'")))
    }

    pub async fn list_active(&self) -> CoreResult<Vec<NotificationTemplate>> {
        self.store.list_active_templates().await
    }

    /// Replaces a template's content after re-validating syntax.
    #[instrument(skip(self))]
    pub async fn update_content(
        &self,
        id: TemplateId,
        name: String,
        title_template: String,
        message_template: String,
    ) -> CoreResult<NotificationTemplate> {
        Self::check_syntax(&title_template)?;
        Self::check_syntax(&message_template)?;

        let mut template = self.get(id).await?;
        template.update_content(name, title_template, message_template);
        self.store.update_template(template).await
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, id: TemplateId) -> CoreResult<()> {
        self.store.set_template_active(id, true).await
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: TemplateId) -> CoreResult<()> {
        self.store.set_template_active(id, false).await
    }

    /// Builds a notification from an active template, rendering strictly
    /// and applying the template's defaults.
    #[instrument(skip(self, params))]
    pub async fn instantiate(
        &self,
        id: TemplateId,
        recipient: UserId,
        params: &HashMap<String, String>,
    ) -> CoreResult<Notification> {
        let template = self.get(id).await?;
        if !template.is_active {
            return Err(CoreError::validation(format!(
                "template '{}' is inactive",
                template.name
            )));
        }

        let (title, message) = TemplateRenderer::render_pair(
            &template.title_template,
            &template.message_template,
            params,
        )?;

        let mut notification = Notification::new(title, message, template.notification_type);
        notification.set_recipient(recipient);
        notification.set_priority(template.default_priority);
        notification.set_channels(template.default_channels);
        notification.set_template(template.id);
        notification.is_persistent = template.is_persistent;
        notification.is_dismissible = template.is_dismissible;
        if let Some(url) = template.default_action_url {
            notification.set_action_url(url);
        }
        if let Some(hours) = template.expiration_hours {
            notification.set_expiration(Utc::now() + Duration::hours(hours as i64));
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_models::{NotificationPriority, NotificationType};
    use stockflow_store::MemoryStore;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_with_all_params() {
        let out = TemplateRenderer::render(
            "Hello {name}, you have {count} items",
            &params(&[("name", "Ada"), ("count", "3")]),
        )
        .unwrap();
        assert_eq!(out, "Hello Ada, you have 3 items");
    }

    #[test]
    fn missing_params_are_all_reported() {
        let err = TemplateRenderer::render(
            "Hello {name}, you have {count} items",
            &params(&[]),
        )
        .unwrap_err();
        match err {
            CoreError::MissingParameter(names) => {
                assert_eq!(names, vec!["count".to_string(), "name".to_string()]);
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn extra_params_are_ignored() {
        let out = TemplateRenderer::render(
            "Hello {name}",
            &params(&[("name", "Ada"), ("unused", "x")]),
        )
        .unwrap();
        assert_eq!(out, "Hello Ada");
    }

    #[test]
    fn repeated_placeholder_substitutes_everywhere() {
        let out =
            TemplateRenderer::render("{name} and {name}", &params(&[("name", "Ada")])).unwrap();
        assert_eq!(out, "Ada and Ada");
    }

    #[test]
    fn bad_placeholder_names_are_rejected() {
        for bad in ["{1count}", "{}", "{a-b}", "{a b}"] {
            assert!(matches!(
                TemplateRenderer::render(bad, &params(&[])),
                Err(CoreError::InvalidTemplate(_))
            ));
        }
    }

    #[test]
    fn validation_reports_without_failing() {
        let report =
            TemplateRenderer::validate("Hi {name}, {count} left {", &params(&[("name", "A")]));
        assert!(!report.is_valid);
        assert_eq!(report.missing_parameters, vec!["count".to_string()]);
        assert!(report.errors.iter().any(|e| e.contains("unbalanced")));
    }

    #[test]
    fn valid_template_with_full_params_passes() {
        let report = TemplateRenderer::validate("Hi {name}", &params(&[("name", "A")]));
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.missing_parameters.is_empty());
    }

    #[test]
    fn pair_rendering_unions_missing_names() {
        let err = TemplateRenderer::render_pair("Hi {name}", "{count} of {total}", &params(&[]))
            .unwrap_err();
        match err {
            CoreError::MissingParameter(names) => {
                assert_eq!(names, vec!["count", "name", "total"]);
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    fn dto(name: &str) -> CreateTemplateDto {
        CreateTemplateDto {
            name: name.to_string(),
            description: None,
            title_template: "Stock low: {product}".to_string(),
            message_template: "Only {remaining} units of {product} left".to_string(),
            notification_type: NotificationType::StockAlert,
            default_priority: Some(NotificationPriority::High),
            default_channels: None,
            default_action_url: Some("/products/{product}".to_string()),
            expiration_hours: Some(24),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_names_and_bad_syntax() {
        let service = TemplateService::new(Arc::new(MemoryStore::new()));
        let creator = UserId::new();

        service.create(dto("stock-low"), creator).await.unwrap();
        assert!(matches!(
            service.create(dto("stock-low"), creator).await,
            Err(CoreError::DuplicateName(_))
        ));

        let mut bad = dto("broken");
        bad.message_template = "Only {1remaining} left".to_string();
        assert!(matches!(
            service.create(bad, creator).await,
            Err(CoreError::InvalidTemplate(_))
        ));
    }

    #[tokio::test]
    async fn instantiate_applies_template_defaults() {
        let service = TemplateService::new(Arc::new(MemoryStore::new()));
        let template = service.create(dto("stock-low"), UserId::new()).await.unwrap();
        let recipient = UserId::new();

        let notification = service
            .instantiate(
                template.id,
                recipient,
                &params(&[("product", "Widget"), ("remaining", "4")]),
            )
            .await
            .unwrap();

        assert_eq!(notification.title, "Stock low: Widget");
        assert_eq!(notification.message, "Only 4 units of Widget left");
        assert_eq!(notification.priority, NotificationPriority::High);
        assert_eq!(notification.recipient_id, Some(recipient));
        assert_eq!(notification.template_id, Some(template.id));
        assert!(notification.expires_at.is_some());
    }

    #[tokio::test]
    async fn instantiate_refuses_inactive_templates() {
        let service = TemplateService::new(Arc::new(MemoryStore::new()));
        let template = service.create(dto("stock-low"), UserId::new()).await.unwrap();
        service.deactivate(template.id).await.unwrap();

        let err = service
            .instantiate(
                template.id,
                UserId::new(),
                &params(&[("product", "Widget"), ("remaining", "4")]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn instantiate_reports_missing_params_across_both_strings() {
        let service = TemplateService::new(Arc::new(MemoryStore::new()));
        let template = service.create(dto("stock-low"), UserId::new()).await.unwrap();

        let err = service
            .instantiate(template.id, UserId::new(), &params(&[]))
            .await
            .unwrap_err();
        match err {
            CoreError::MissingParameter(names) => {
                assert_eq!(names, vec!["product", "remaining"]);
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }
}
