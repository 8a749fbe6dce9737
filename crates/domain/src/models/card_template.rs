//! Card template domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_TEMPLATE_NAME: &str = "Standard Member Card";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#1e3a8a";
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";

/// Template category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Standard,
    Premium,
    Custom,
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateType::Standard => write!(f, "standard"),
            TemplateType::Premium => write!(f, "premium"),
            TemplateType::Custom => write!(f, "custom"),
        }
    }
}

/// Visual and metadata blueprint used to stamp a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTemplate {
    pub id: Uuid,
    pub company_id: i64,
    pub name: String,
    pub template_type: TemplateType,
    pub is_active: bool,
    pub background_color: String,
    pub text_color: String,
    pub logo_url: Option<String>,
    pub front_layout: serde_json::Value,
    pub back_layout: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CardTemplate {
    pub fn is_default_candidate(&self) -> bool {
        self.is_active && self.template_type == TemplateType::Standard
    }
}

/// Picks the canonical default template: the earliest active standard one.
///
/// Ties on creation time are broken by ID so concurrent duplicates always
/// resolve to the same record.
pub fn select_default(templates: &[CardTemplate]) -> Option<&CardTemplate> {
    templates
        .iter()
        .filter(|t| t.is_default_candidate())
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}

/// Input for inserting a template.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCardTemplate {
    pub company_id: i64,
    pub name: String,
    pub template_type: TemplateType,
    pub is_active: bool,
    pub background_color: String,
    pub text_color: String,
    pub logo_url: Option<String>,
    pub front_layout: serde_json::Value,
    pub back_layout: serde_json::Value,
}

impl NewCardTemplate {
    /// Deterministic default styling synthesized when a company has no template.
    pub fn default_for_company(company_id: i64) -> Self {
        Self {
            company_id,
            name: DEFAULT_TEMPLATE_NAME.to_string(),
            template_type: TemplateType::Standard,
            is_active: true,
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            logo_url: None,
            front_layout: json!({
                "fields": ["memberName", "memberId", "groupNumber", "planName"],
                "showQrCode": false
            }),
            back_layout: json!({
                "fields": ["customerServicePhone", "claimsAddress"],
                "showQrCode": true
            }),
        }
    }
}

impl From<CreateTemplateRequest> for NewCardTemplate {
    fn from(req: CreateTemplateRequest) -> Self {
        let defaults = NewCardTemplate::default_for_company(req.company_id);
        Self {
            company_id: req.company_id,
            name: req.name,
            template_type: req.template_type.unwrap_or(TemplateType::Standard),
            is_active: req.is_active.unwrap_or(true),
            background_color: req.background_color.unwrap_or(defaults.background_color),
            text_color: req.text_color.unwrap_or(defaults.text_color),
            logo_url: req.logo_url,
            front_layout: req.front_layout.unwrap_or(defaults.front_layout),
            back_layout: req.back_layout.unwrap_or(defaults.back_layout),
        }
    }
}

/// Request to create a template.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    #[validate(custom(function = "shared::validation::validate_external_id"))]
    pub company_id: i64,

    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,

    pub template_type: Option<TemplateType>,

    pub is_active: Option<bool>,

    #[validate(custom(function = "shared::validation::validate_hex_color"))]
    pub background_color: Option<String>,

    #[validate(custom(function = "shared::validation::validate_hex_color"))]
    pub text_color: Option<String>,

    #[validate(url(message = "logoUrl must be a valid URL"))]
    pub logo_url: Option<String>,

    pub front_layout: Option<serde_json::Value>,

    pub back_layout: Option<serde_json::Value>,
}

/// Request to update a template. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,

    pub is_active: Option<bool>,

    #[validate(custom(function = "shared::validation::validate_hex_color"))]
    pub background_color: Option<String>,

    #[validate(custom(function = "shared::validation::validate_hex_color"))]
    pub text_color: Option<String>,

    #[validate(url(message = "logoUrl must be a valid URL"))]
    pub logo_url: Option<String>,
}

/// Query parameters for listing templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTemplatesQuery {
    pub company_id: i64,
}
