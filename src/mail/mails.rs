use chrono::{DateTime, Utc};

use super::sendmail::Mailer;

pub async fn send_booking_confirmed_email(
    mailer: &Mailer,
    to_email: &str,
    recipient_name: &str,
    start_at: DateTime<Utc>,
) {
    let subject = "Your consultation is confirmed";
    let body = format!(
        "Hi {},\n\nYour consultation on {} has been confirmed.\n\nSee you then!",
        recipient_name,
        start_at.format("%Y-%m-%d %H:%M UTC"),
    );
    let _ = mailer.send(to_email, subject, &body).await;
}

pub async fn send_booking_cancelled_email(
    mailer: &Mailer,
    to_email: &str,
    recipient_name: &str,
    start_at: DateTime<Utc>,
    reason: Option<&str>,
) {
    let subject = "Your consultation was cancelled";
    let body = match reason {
        Some(reason) => format!(
            "Hi {},\n\nYour consultation on {} was cancelled.\nReason: {}\n",
            recipient_name,
            start_at.format("%Y-%m-%d %H:%M UTC"),
            reason,
        ),
        None => format!(
            "Hi {},\n\nYour consultation on {} was cancelled.\n",
            recipient_name,
            start_at.format("%Y-%m-%d %H:%M UTC"),
        ),
    };
    let _ = mailer.send(to_email, subject, &body).await;
}
