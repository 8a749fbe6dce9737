//! Card template catalog.

use std::sync::Arc;

use uuid::Uuid;

use super::store::TemplateStore;
use crate::error::CardError;
use crate::models::card_template::{
    select_default, CardTemplate, CreateTemplateRequest, NewCardTemplate, UpdateTemplateRequest,
};

/// Template lookups and the per-company default.
#[derive(Clone)]
pub struct TemplateCatalog {
    store: Arc<dyn TemplateStore>,
}

impl TemplateCatalog {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    pub async fn get_template(&self, id: Uuid) -> Result<CardTemplate, CardError> {
        self.store
            .find_template(id)
            .await?
            .ok_or_else(|| CardError::not_found("Template"))
    }

    /// Returns the company's default template, creating it on first use.
    ///
    /// Concurrent first calls may each insert a template; every later read
    /// converges on the earliest one.
    pub async fn get_or_create_default(&self, company_id: i64) -> Result<CardTemplate, CardError> {
        let templates = self.store.list_company_templates(company_id).await?;
        if let Some(template) = select_default(&templates) {
            return Ok(template.clone());
        }

        self.store
            .insert_template(NewCardTemplate::default_for_company(company_id))
            .await?;
        tracing::info!(company_id = %company_id, "Created default card template");

        let templates = self.store.list_company_templates(company_id).await?;
        select_default(&templates)
            .cloned()
            .ok_or_else(|| CardError::Internal("Default template vanished after insert".into()))
    }

    pub async fn create_template(
        &self,
        request: CreateTemplateRequest,
    ) -> Result<CardTemplate, CardError> {
        let template = self.store.insert_template(request.into()).await?;
        tracing::info!(
            template_id = %template.id,
            company_id = %template.company_id,
            template_type = %template.template_type,
            "Card template created"
        );
        Ok(template)
    }

    pub async fn list_templates(&self, company_id: i64) -> Result<Vec<CardTemplate>, CardError> {
        Ok(self.store.list_company_templates(company_id).await?)
    }

    pub async fn update_template(
        &self,
        id: Uuid,
        update: UpdateTemplateRequest,
    ) -> Result<CardTemplate, CardError> {
        self.store
            .update_template(id, &update)
            .await?
            .ok_or_else(|| CardError::not_found("Template"))
    }
}
