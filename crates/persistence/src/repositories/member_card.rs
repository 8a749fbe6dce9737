//! Repository for member card database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::card::{CardType, IssuedCard, MemberCard, NewMemberCard, StatusChange};
use domain::services::store::CardStore;
use domain::StoreError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::error::{is_unique_violation_on, store_error, TOKEN_UNIQUE_CONSTRAINT};
use super::production_batch::join_pending_batch;
use crate::entities::member_card::{CardStatusDb, CardTypeDb, MEMBER_CARD_COLUMNS};
use crate::entities::MemberCardEntity;
use crate::metrics::QueryTimer;

/// Repository for member card operations.
#[derive(Clone)]
pub struct CardRepository {
    pool: PgPool,
}

impl CardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn issue_in_transaction(
        &self,
        cards: &[NewMemberCard],
    ) -> Result<Vec<IssuedCard>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // An early return drops `tx`, rolling back every card inserted so far.
        let mut issued = Vec::with_capacity(cards.len());
        for card in cards {
            let entity = insert_card(&mut tx, card).await?;
            if let Some(original) = card.replaces_card_id {
                link_replacement(&mut tx, original, entity.id).await?;
            }
            let batch = if card.card_type == CardType::Physical {
                Some(join_pending_batch(&mut tx, entity.id).await?)
            } else {
                None
            };
            issued.push(IssuedCard {
                card: entity.into(),
                batch,
            });
        }

        tx.commit().await.map_err(store_error)?;
        Ok(issued)
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM member_cards WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)
    }
}

async fn insert_card(
    tx: &mut Transaction<'_, Postgres>,
    card: &NewMemberCard,
) -> Result<MemberCardEntity, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO member_cards (
            id, member_id, template_id, card_type, card_status, verification_token,
            expires_at, shipping_address, expedited_shipping, replaces_card_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {MEMBER_CARD_COLUMNS}
        "#
    );
    sqlx::query_as::<_, MemberCardEntity>(&sql)
        .bind(Uuid::new_v4())
        .bind(card.member_id)
        .bind(card.template_id)
        .bind(CardTypeDb::from(card.card_type))
        .bind(CardStatusDb::from(card.card_status))
        .bind(&card.verification_token)
        .bind(card.expires_at)
        .bind(&card.shipping_address)
        .bind(card.expedited_shipping)
        .bind(card.replaces_card_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, TOKEN_UNIQUE_CONSTRAINT) {
                StoreError::Duplicate("verification token".to_string())
            } else {
                store_error(e)
            }
        })
}

/// Points the original card at its replacement unless another replacement
/// got there first.
async fn link_replacement(
    tx: &mut Transaction<'_, Postgres>,
    original: Uuid,
    replacement: Uuid,
) -> Result<(), StoreError> {
    let linked = sqlx::query(
        r#"
        UPDATE member_cards
        SET replaced_by_card_id = $2, updated_at = NOW()
        WHERE id = $1 AND replaced_by_card_id IS NULL
        "#,
    )
    .bind(original)
    .bind(replacement)
    .execute(&mut **tx)
    .await
    .map_err(store_error)?;

    if linked.rows_affected() > 0 {
        return Ok(());
    }

    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM member_cards WHERE id = $1)")
            .bind(original)
            .fetch_one(&mut **tx)
            .await
            .map_err(store_error)?;

    Err(if exists {
        StoreError::VersionConflict
    } else {
        StoreError::NotFound
    })
}

#[async_trait]
impl CardStore for CardRepository {
    async fn issue_cards(&self, cards: Vec<NewMemberCard>) -> Result<Vec<IssuedCard>, StoreError> {
        let timer = QueryTimer::start("issue_cards");
        let result = self.issue_in_transaction(&cards).await;
        timer.finish(result)
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<MemberCard>, StoreError> {
        let sql = format!("SELECT {MEMBER_CARD_COLUMNS} FROM member_cards WHERE id = $1");
        let entity = sqlx::query_as::<_, MemberCardEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn find_card_by_token(&self, token: &str) -> Result<Option<MemberCard>, StoreError> {
        let timer = QueryTimer::start("find_card_by_token");
        let sql =
            format!("SELECT {MEMBER_CARD_COLUMNS} FROM member_cards WHERE verification_token = $1");
        let result = sqlx::query_as::<_, MemberCardEntity>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await;
        let result = timer.finish(result);

        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn list_member_cards(&self, member_id: i64) -> Result<Vec<MemberCard>, StoreError> {
        let sql = format!(
            r#"
            SELECT {MEMBER_CARD_COLUMNS}
            FROM member_cards
            WHERE member_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        );
        let rows = sqlx::query_as::<_, MemberCardEntity>(&sql)
            .bind(member_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn apply_status_change(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<MemberCard, StoreError> {
        let sql = format!(
            r#"
            UPDATE member_cards
            SET card_status = $3,
                deactivated_at = $4,
                deactivation_reason = $5,
                needs_replacement = $6,
                notes = $7,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {MEMBER_CARD_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, MemberCardEntity>(&sql)
            .bind(id)
            .bind(change.expected_version)
            .bind(CardStatusDb::from(change.status))
            .bind(change.deactivated_at)
            .bind(&change.deactivation_reason)
            .bind(change.needs_replacement)
            .bind(&change.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        match updated {
            Some(entity) => Ok(entity.into()),
            None if self.exists(id).await? => Err(StoreError::VersionConflict),
            None => Err(StoreError::NotFound),
        }
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE member_cards
            SET last_used_at = GREATEST(COALESCE(last_used_at, $2), $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}
