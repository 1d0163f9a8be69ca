// service/ratings_service.rs
//
// Review lifecycle plus the denormalized rating caches. The stored
// `rating_avg` / `ratings_count` columns are only ever written by the
// recompute paths here; every review create/update/delete/restore runs
// them. Failures during a recompute are logged with the entity id and
// re-raised: a silently stale rating cache is worse than a visible error.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{bookingdb::BookingExt, db::DBClient, reviewdb::ReviewExt},
    dtos::reviewdtos::{CreateReviewDto, UpdateReviewDto},
    models::{
        bookingmodel::{Bookable, Booking, BookingStatus},
        reviewmodel::Review,
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct RatingsService {
    db_client: Arc<DBClient>,
}

impl RatingsService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// One review per booking, reviewable only once completed, written by
    /// the booking's client. The uniqueness constraint on `booking_id`
    /// (covering soft-deleted rows) is the duplicate gate, not a
    /// check-then-insert.
    pub async fn create_review(
        &self,
        client_id: Uuid,
        dto: &CreateReviewDto,
    ) -> Result<Review, ServiceError> {
        if !(1..=5).contains(&dto.rating) {
            return Err(ServiceError::RatingOutOfRange);
        }

        let booking = self
            .db_client
            .get_booking(dto.booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(dto.booking_id))?;

        if booking.client_id != client_id {
            return Err(ServiceError::NotBookingOwner(client_id, booking.id));
        }
        if booking.status != BookingStatus::Completed {
            return Err(ServiceError::ReviewNotAllowed);
        }

        // Soft-deleted reviews also count: one review per booking, ever.
        // The unique constraint below stays as the racing-writer guard.
        if self
            .db_client
            .get_review_by_booking(booking.id)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateReview);
        }

        let consultant_service_id = dto
            .consultant_service_id
            .or_else(|| derive_service_id(&booking));

        let review = self
            .db_client
            .insert_review(
                booking.id,
                booking.consultant_id,
                client_id,
                consultant_service_id,
                dto.rating,
                dto.comment.clone(),
            )
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    ServiceError::DuplicateReview
                }
                _ => ServiceError::Database(e),
            })?;

        self.recompute_for(&review).await?;
        Ok(review)
    }

    pub async fn update_review(
        &self,
        review_id: Uuid,
        actor: &User,
        dto: &UpdateReviewDto,
    ) -> Result<Review, ServiceError> {
        if !(1..=5).contains(&dto.rating) {
            return Err(ServiceError::RatingOutOfRange);
        }

        let review = self.get_owned_review(review_id, actor).await?;
        if review.deleted_at.is_some() {
            return Err(ServiceError::ReviewNotFound(review_id));
        }

        let updated = self
            .db_client
            .update_review(review.id, dto.rating, dto.comment.clone())
            .await?;
        self.recompute_for(&updated).await?;
        Ok(updated)
    }

    pub async fn delete_review(&self, review_id: Uuid, actor: &User) -> Result<Review, ServiceError> {
        let review = self.get_owned_review(review_id, actor).await?;
        if review.deleted_at.is_some() {
            return Err(ServiceError::ReviewNotFound(review_id));
        }

        let deleted = self.db_client.soft_delete_review(review.id).await?;
        self.recompute_for(&deleted).await?;
        Ok(deleted)
    }

    /// Restore is admin-only; clearing `deleted_at` re-enters the review
    /// into the aggregates exactly like a create.
    pub async fn restore_review(
        &self,
        review_id: Uuid,
        actor: &User,
    ) -> Result<Review, ServiceError> {
        if actor.role != UserRole::Admin {
            return Err(ServiceError::NotBookingOwner(actor.id, review_id));
        }

        let review = self
            .db_client
            .get_review(review_id)
            .await?
            .ok_or(ServiceError::ReviewNotFound(review_id))?;
        if review.deleted_at.is_none() {
            return Err(ServiceError::Validation(
                "Review is not deleted".to_string(),
            ));
        }

        let restored = self.db_client.restore_review(review.id).await?;
        self.recompute_for(&restored).await?;
        Ok(restored)
    }

    /// Recomputes a consultant's cached average and count from the
    /// non-deleted review set, inside one transaction.
    pub async fn update_consultant_ratings(&self, consultant_id: Uuid) -> Result<(), ServiceError> {
        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.db_client.pool.begin().await?;
            let summary = self
                .db_client
                .consultant_rating_summary(&mut tx, consultant_id)
                .await?;
            self.db_client
                .set_consultant_ratings(&mut tx, consultant_id, summary.rating_avg, summary.ratings_count)
                .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;

        result.map_err(|e| {
            tracing::error!(
                "Failed to recompute ratings for consultant {}: {}",
                consultant_id,
                e
            );
            ServiceError::Database(e)
        })
    }

    pub async fn update_service_ratings(&self, service_id: Uuid) -> Result<(), ServiceError> {
        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.db_client.pool.begin().await?;
            let summary = self
                .db_client
                .service_rating_summary(&mut tx, service_id)
                .await?;
            self.db_client
                .set_service_ratings(&mut tx, service_id, summary.rating_avg, summary.ratings_count)
                .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;

        result.map_err(|e| {
            tracing::error!(
                "Failed to recompute ratings for service {}: {}",
                service_id,
                e
            );
            ServiceError::Database(e)
        })
    }

    /// Consultant always; service only when the review is service-scoped.
    async fn recompute_for(&self, review: &Review) -> Result<(), ServiceError> {
        self.update_consultant_ratings(review.consultant_id).await?;
        if let Some(service_id) = review.consultant_service_id {
            self.update_service_ratings(service_id).await?;
        }
        Ok(())
    }

    async fn get_owned_review(&self, review_id: Uuid, actor: &User) -> Result<Review, ServiceError> {
        let review = self
            .db_client
            .get_review(review_id)
            .await?
            .ok_or(ServiceError::ReviewNotFound(review_id))?;

        if actor.role != UserRole::Admin && review.client_id != actor.id {
            return Err(ServiceError::NotBookingOwner(actor.id, review_id));
        }
        Ok(review)
    }
}

fn derive_service_id(booking: &Booking) -> Option<Uuid> {
    match booking.bookable() {
        Bookable::ConsultantService(service_id) => Some(service_id),
        Bookable::Consultant(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        bookingmodel::{BookableType, Booking},
        consultantmodel::ConsultationMethod,
    };
    use chrono::{TimeZone, Utc};

    fn booking(bookable_type: BookableType, bookable_id: Uuid) -> Booking {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        Booking {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            consultant_id: Uuid::new_v4(),
            bookable_type,
            bookable_id,
            start_at: start,
            end_at: start + chrono::Duration::minutes(60),
            duration_minutes: 60,
            buffer_after_minutes: 15,
            status: BookingStatus::Completed,
            expires_at: None,
            price: 100.0,
            method: ConsultationMethod::Video,
            cancelled_at: None,
            cancelled_by_type: None,
            cancelled_by_id: None,
            cancel_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn service_id_derived_only_for_service_bookings() {
        let service_id = Uuid::new_v4();
        let b = booking(BookableType::ConsultantService, service_id);
        assert_eq!(derive_service_id(&b), Some(service_id));

        let b = booking(BookableType::Consultant, Uuid::new_v4());
        assert_eq!(derive_service_id(&b), None);
    }
}
