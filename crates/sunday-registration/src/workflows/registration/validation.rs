use chrono::{Datelike, NaiveDate, Weekday};

use super::domain::{normalize_email, Registrant, RegistrationForm};

pub const DEFAULT_SESSION_LABEL: &str = "Sunday Service";

/// Validation errors raised before anything is written to the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown community '{0}'")]
    UnknownCommunity(String),
    #[error("submission contains no registrants")]
    NoRegistrants,
    #[error("registrant {index} is missing a first or last name")]
    MissingName { index: usize },
    #[error("registrant {index} has an invalid email address '{email}'")]
    InvalidEmail { index: usize, email: String },
    #[error("{0} is not a Sunday")]
    NotSunday(NaiveDate),
}

/// Submission after trimming and normalization, ready to become records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    pub session_label: String,
    pub sunday_date: NaiveDate,
    pub registrants: Vec<Registrant>,
}

/// Checks a raw form and produces a normalized batch.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    default_session_label: String,
}

impl Default for IntakeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_LABEL)
    }
}

impl IntakeGuard {
    pub fn new(default_session_label: impl Into<String>) -> Self {
        Self {
            default_session_label: default_session_label.into(),
        }
    }

    pub fn default_session_label(&self) -> &str {
        &self.default_session_label
    }

    pub fn batch_from_form(&self, form: &RegistrationForm) -> Result<ValidatedBatch, ValidationError> {
        if form.sunday_date.weekday() != Weekday::Sun {
            return Err(ValidationError::NotSunday(form.sunday_date));
        }

        if form.registrants.is_empty() {
            return Err(ValidationError::NoRegistrants);
        }

        let registrants = form
            .registrants
            .iter()
            .enumerate()
            .map(|(index, registrant)| sanitize(index, registrant))
            .collect::<Result<Vec<_>, _>>()?;

        let session_label = form
            .session_info
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(&self.default_session_label)
            .to_string();

        Ok(ValidatedBatch {
            session_label,
            sunday_date: form.sunday_date,
            registrants,
        })
    }
}

fn sanitize(index: usize, registrant: &Registrant) -> Result<Registrant, ValidationError> {
    let first_name = registrant.first_name.trim();
    let last_name = registrant.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(ValidationError::MissingName { index });
    }

    let email = normalize_email(&registrant.email);
    if !looks_like_email(&email) {
        return Err(ValidationError::InvalidEmail {
            index,
            email: registrant.email.clone(),
        });
    }

    Ok(Registrant {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email,
        registrant_type: registrant.registrant_type,
    })
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::registration::domain::RegistrantType;

    fn form(sunday: NaiveDate) -> RegistrationForm {
        RegistrationForm {
            community: None,
            session_info: None,
            sunday_date: sunday,
            registrants: vec![Registrant {
                first_name: " Alice ".to_string(),
                last_name: "Smith".to_string(),
                email: " Alice@Example.COM ".to_string(),
                registrant_type: RegistrantType::Member,
            }],
        }
    }

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 3).expect("valid date")
    }

    #[test]
    fn normalizes_names_email_and_session_label() {
        let batch = IntakeGuard::default()
            .batch_from_form(&form(sunday()))
            .expect("valid form");
        assert_eq!(batch.session_label, DEFAULT_SESSION_LABEL);
        assert_eq!(batch.registrants[0].first_name, "Alice");
        assert_eq!(batch.registrants[0].email, "alice@example.com");
    }

    #[test]
    fn blank_session_info_falls_back_to_default() {
        let mut form = form(sunday());
        form.session_info = Some("   ".to_string());
        let batch = IntakeGuard::new("Morning Worship")
            .batch_from_form(&form)
            .expect("valid form");
        assert_eq!(batch.session_label, "Morning Worship");
    }

    #[test]
    fn rejects_dates_that_are_not_sundays() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date");
        assert_eq!(
            IntakeGuard::default().batch_from_form(&form(monday)),
            Err(ValidationError::NotSunday(monday))
        );
    }

    #[test]
    fn rejects_empty_batches_and_bad_registrants() {
        let guard = IntakeGuard::default();

        let mut empty = form(sunday());
        empty.registrants.clear();
        assert_eq!(guard.batch_from_form(&empty), Err(ValidationError::NoRegistrants));

        let mut nameless = form(sunday());
        nameless.registrants[0].last_name = " ".to_string();
        assert_eq!(
            guard.batch_from_form(&nameless),
            Err(ValidationError::MissingName { index: 0 })
        );

        let mut bad_email = form(sunday());
        bad_email.registrants[0].email = "alice.example.com".to_string();
        assert!(matches!(
            guard.batch_from_form(&bad_email),
            Err(ValidationError::InvalidEmail { index: 0, .. })
        ));
    }
}
