//! Card template entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::card_template::{CardTemplate, TemplateType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for template type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "template_type", rename_all = "lowercase")]
pub enum TemplateTypeDb {
    Standard,
    Premium,
    Custom,
}

impl From<TemplateType> for TemplateTypeDb {
    fn from(t: TemplateType) -> Self {
        match t {
            TemplateType::Standard => TemplateTypeDb::Standard,
            TemplateType::Premium => TemplateTypeDb::Premium,
            TemplateType::Custom => TemplateTypeDb::Custom,
        }
    }
}

impl From<TemplateTypeDb> for TemplateType {
    fn from(t: TemplateTypeDb) -> Self {
        match t {
            TemplateTypeDb::Standard => TemplateType::Standard,
            TemplateTypeDb::Premium => TemplateType::Premium,
            TemplateTypeDb::Custom => TemplateType::Custom,
        }
    }
}

/// Database row mapping for the card_templates table.
#[derive(Debug, Clone, FromRow)]
pub struct CardTemplateEntity {
    pub id: Uuid,
    pub company_id: i64,
    pub name: String,
    pub template_type: TemplateTypeDb,
    pub is_active: bool,
    pub background_color: String,
    pub text_color: String,
    pub logo_url: Option<String>,
    pub front_layout: serde_json::Value,
    pub back_layout: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CardTemplateEntity> for CardTemplate {
    fn from(entity: CardTemplateEntity) -> Self {
        Self {
            id: entity.id,
            company_id: entity.company_id,
            name: entity.name,
            template_type: entity.template_type.into(),
            is_active: entity.is_active,
            background_color: entity.background_color,
            text_color: entity.text_color,
            logo_url: entity.logo_url,
            front_layout: entity.front_layout,
            back_layout: entity.back_layout,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
