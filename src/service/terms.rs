// service/terms.rs
//
// Duration / buffer / price / method resolution shared by the booking
// write paths and the availability engine.

use crate::{
    models::consultantmodel::{Consultant, ConsultantService, ConsultationMethod},
    service::error::ServiceError,
    utils::money,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookingTerms {
    pub duration_minutes: i32,
    pub buffer_after_minutes: i32,
    pub price: f64,
    pub method: ConsultationMethod,
}

/// Resolves the terms of a booking from its target.
///
/// Service bookings take duration, price and method from the service, with
/// the buffer falling back service -> consultant -> 0. Direct consultant
/// bookings require the caller to supply duration and method; the price is
/// the hourly rate pro-rated over the duration.
pub fn resolve_terms(
    consultant: &Consultant,
    service: Option<&ConsultantService>,
    requested_duration: Option<i32>,
    requested_method: Option<ConsultationMethod>,
) -> Result<BookingTerms, ServiceError> {
    match service {
        Some(service) => Ok(BookingTerms {
            duration_minutes: service.duration_minutes,
            buffer_after_minutes: service
                .buffer_after_minutes
                .or(consultant.buffer_after_minutes)
                .unwrap_or(0),
            price: service.price,
            method: service.method,
        }),
        None => {
            let duration_minutes = requested_duration.ok_or(ServiceError::Validation(
                "duration_minutes is required when booking a consultant directly".to_string(),
            ))?;
            let method = requested_method.ok_or(ServiceError::Validation(
                "method is required when booking a consultant directly".to_string(),
            ))?;

            Ok(BookingTerms {
                duration_minutes,
                buffer_after_minutes: consultant.buffer_after_minutes.unwrap_or(0),
                price: money::hourly_price(consultant.hourly_rate, duration_minutes),
                method,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn consultant(hourly_rate: f64, buffer: Option<i32>) -> Consultant {
        Consultant {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            headline: None,
            hourly_rate,
            buffer_after_minutes: buffer,
            default_method: None,
            rating_avg: 0.0,
            ratings_count: 0,
            deleted_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn service(consultant_id: Uuid, duration: i32, buffer: Option<i32>) -> ConsultantService {
        ConsultantService {
            id: Uuid::new_v4(),
            consultant_id,
            title: "Intro call".to_string(),
            price: 80.0,
            duration_minutes: duration,
            buffer_after_minutes: buffer,
            method: ConsultationMethod::Video,
            rating_avg: 0.0,
            ratings_count: 0,
            deleted_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn service_terms_come_from_the_service() {
        let c = consultant(100.0, Some(10));
        let s = service(c.id, 45, Some(20));

        let terms = resolve_terms(&c, Some(&s), None, None).unwrap();
        assert_eq!(terms.duration_minutes, 45);
        assert_eq!(terms.buffer_after_minutes, 20);
        assert_eq!(terms.price, 80.0);
        assert_eq!(terms.method, ConsultationMethod::Video);
    }

    #[test]
    fn service_buffer_falls_back_to_consultant_then_zero() {
        let c = consultant(100.0, Some(10));
        let s = service(c.id, 45, None);
        assert_eq!(
            resolve_terms(&c, Some(&s), None, None).unwrap().buffer_after_minutes,
            10
        );

        let c = consultant(100.0, None);
        let s = service(c.id, 45, None);
        assert_eq!(
            resolve_terms(&c, Some(&s), None, None).unwrap().buffer_after_minutes,
            0
        );
    }

    #[test]
    fn direct_booking_requires_duration_and_method() {
        let c = consultant(100.0, None);
        assert!(resolve_terms(&c, None, None, Some(ConsultationMethod::Phone)).is_err());
        assert!(resolve_terms(&c, None, Some(60), None).is_err());
    }

    #[test]
    fn direct_booking_price_is_prorated_hourly_rate() {
        let c = consultant(120.0, Some(15));
        let terms = resolve_terms(&c, None, Some(90), Some(ConsultationMethod::Phone)).unwrap();
        assert_eq!(terms.price, 180.0);
        assert_eq!(terms.buffer_after_minutes, 15);
        assert_eq!(terms.method, ConsultationMethod::Phone);
    }
}
