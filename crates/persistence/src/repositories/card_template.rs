//! Repository for card template database operations.

use async_trait::async_trait;
use domain::models::card_template::{CardTemplate, NewCardTemplate, UpdateTemplateRequest};
use domain::services::store::TemplateStore;
use domain::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use super::error::store_error;
use crate::entities::card_template::TemplateTypeDb;
use crate::entities::CardTemplateEntity;

/// Repository for card template operations.
#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for TemplateRepository {
    async fn insert_template(
        &self,
        template: NewCardTemplate,
    ) -> Result<CardTemplate, StoreError> {
        let entity = sqlx::query_as::<_, CardTemplateEntity>(
            r#"
            INSERT INTO card_templates (
                company_id, name, template_type, is_active, background_color,
                text_color, logo_url, front_layout, back_layout
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, company_id, name, template_type, is_active, background_color,
                      text_color, logo_url, front_layout, back_layout, created_at, updated_at
            "#,
        )
        .bind(template.company_id)
        .bind(&template.name)
        .bind(TemplateTypeDb::from(template.template_type))
        .bind(template.is_active)
        .bind(&template.background_color)
        .bind(&template.text_color)
        .bind(&template.logo_url)
        .bind(&template.front_layout)
        .bind(&template.back_layout)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(entity.into())
    }

    async fn find_template(&self, id: Uuid) -> Result<Option<CardTemplate>, StoreError> {
        let entity = sqlx::query_as::<_, CardTemplateEntity>(
            r#"
            SELECT id, company_id, name, template_type, is_active, background_color,
                   text_color, logo_url, front_layout, back_layout, created_at, updated_at
            FROM card_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(entity.map(Into::into))
    }

    async fn list_company_templates(
        &self,
        company_id: i64,
    ) -> Result<Vec<CardTemplate>, StoreError> {
        let rows = sqlx::query_as::<_, CardTemplateEntity>(
            r#"
            SELECT id, company_id, name, template_type, is_active, background_color,
                   text_color, logo_url, front_layout, back_layout, created_at, updated_at
            FROM card_templates
            WHERE company_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_template(
        &self,
        id: Uuid,
        update: &UpdateTemplateRequest,
    ) -> Result<Option<CardTemplate>, StoreError> {
        let entity = sqlx::query_as::<_, CardTemplateEntity>(
            r#"
            UPDATE card_templates
            SET name = COALESCE($2, name),
                is_active = COALESCE($3, is_active),
                background_color = COALESCE($4, background_color),
                text_color = COALESCE($5, text_color),
                logo_url = COALESCE($6, logo_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, company_id, name, template_type, is_active, background_color,
                      text_color, logo_url, front_layout, back_layout, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.is_active)
        .bind(&update.background_color)
        .bind(&update.text_color)
        .bind(&update.logo_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(entity.map(Into::into))
    }
}
