// db/reviewdb.rs
use async_trait::async_trait;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::reviewmodel::{RatingSummary, Review};

const REVIEW_COLUMNS: &str = r#"id, booking_id, consultant_id, client_id,
    consultant_service_id, rating, comment, deleted_at, created_at, updated_at"#;

#[async_trait]
pub trait ReviewExt {
    async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>, Error>;

    /// Includes soft-deleted rows: a soft-deleted review still blocks a
    /// second review for the same booking.
    async fn get_review_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>, Error>;

    async fn insert_review(
        &self,
        booking_id: Uuid,
        consultant_id: Uuid,
        client_id: Uuid,
        consultant_service_id: Option<Uuid>,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, Error>;

    async fn update_review(
        &self,
        review_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, Error>;

    async fn soft_delete_review(&self, review_id: Uuid) -> Result<Review, Error>;

    async fn restore_review(&self, review_id: Uuid) -> Result<Review, Error>;

    /// Single aggregate over the non-deleted review set; avoids loading
    /// the rows themselves.
    async fn consultant_rating_summary(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
    ) -> Result<RatingSummary, Error>;

    async fn service_rating_summary(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        service_id: Uuid,
    ) -> Result<RatingSummary, Error>;

    async fn set_consultant_ratings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
        rating_avg: f64,
        ratings_count: i64,
    ) -> Result<(), Error>;

    async fn set_service_ratings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        service_id: Uuid,
        rating_avg: f64,
        ratings_count: i64,
    ) -> Result<(), Error>;
}

#[async_trait]
impl ReviewExt for DBClient {
    async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>, Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"#
        ))
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_review_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>, Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"SELECT {REVIEW_COLUMNS} FROM reviews WHERE booking_id = $1"#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_review(
        &self,
        booking_id: Uuid,
        consultant_id: Uuid,
        client_id: Uuid,
        consultant_service_id: Option<Uuid>,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (booking_id, consultant_id, client_id,
                consultant_service_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(consultant_id)
        .bind(client_id)
        .bind(consultant_service_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET rating = $2, comment = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }

    async fn soft_delete_review(&self, review_id: Uuid) -> Result<Review, Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn restore_review(&self, review_id: Uuid) -> Result<Review, Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn consultant_rating_summary(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
    ) -> Result<RatingSummary, Error> {
        sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT COALESCE(ROUND(AVG(rating)::numeric, 2), 0)::float8 AS rating_avg,
                   COUNT(*) AS ratings_count
            FROM reviews
            WHERE consultant_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(consultant_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn service_rating_summary(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        service_id: Uuid,
    ) -> Result<RatingSummary, Error> {
        sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT COALESCE(ROUND(AVG(rating)::numeric, 2), 0)::float8 AS rating_avg,
                   COUNT(*) AS ratings_count
            FROM reviews
            WHERE consultant_service_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(service_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn set_consultant_ratings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
        rating_avg: f64,
        ratings_count: i64,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE consultants
            SET rating_avg = $2, ratings_count = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(consultant_id)
        .bind(rating_avg)
        .bind(ratings_count as i32)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn set_service_ratings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        service_id: Uuid,
        rating_avg: f64,
        ratings_count: i64,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE consultant_services
            SET rating_avg = $2, ratings_count = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(service_id)
        .bind(rating_avg)
        .bind(ratings_count as i32)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
