//! Form validation rules applied by both the server and the client.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    CreateChoreRequest, CreateEventRequest, CreateLearningTaskRequest, CreateRewardRequest,
    CreateTransactionRequest, CreateUserRequest, LoginRequest, RegisterRequest, UpdateChoreRequest,
    UpdateEventRequest, UpdateLearningTaskRequest, UpdateRewardRequest, UpdateUserRequest,
};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_POINTS: i64 = 100_000;
pub const MAX_MONEY: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    Required,
    TooLong(usize),
    TooShort(usize),
    InvalidEmail,
    InvalidDate,
    DateInPast,
    EndBeforeStart,
    OutOfRange { min: f64, max: f64 },
    TooManyDecimals,
    NoCost,
    NothingToRecord,
    NotAllowed,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required => write!(f, "is required"),
            ValidationError::TooLong(max) => write!(f, "cannot exceed {} characters", max),
            ValidationError::TooShort(min) => write!(f, "must be at least {} characters", min),
            ValidationError::InvalidEmail => write!(f, "must be a valid email address"),
            ValidationError::InvalidDate => write!(f, "is not a valid date"),
            ValidationError::DateInPast => write!(f, "cannot be in the past"),
            ValidationError::EndBeforeStart => write!(f, "must be after the start time"),
            ValidationError::OutOfRange { min, max } => write!(f, "must be between {} and {}", min, max),
            ValidationError::TooManyDecimals => write!(f, "can have at most 2 decimal places"),
            ValidationError::NoCost => write!(f, "must cost points or money"),
            ValidationError::NothingToRecord => write!(f, "must change points or money"),
            ValidationError::NotAllowed => write!(f, "is not allowed here"),
        }
    }
}

/// A validation failure tied to the form field that caused it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub error: ValidationError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.error)
    }
}

/// Join field errors into one inline message
pub fn describe_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects field errors for a single form
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, error: ValidationError) -> &mut Self {
        self.errors.push(FieldError { field: field.to_string(), error });
        self
    }

    pub fn required(&mut self, field: &str, value: &str, max_len: usize) -> &mut Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.push(field, ValidationError::Required);
        } else if trimmed.chars().count() > max_len {
            self.push(field, ValidationError::TooLong(max_len));
        }
        self
    }

    /// Like `required`, but only checked when the field was supplied
    pub fn required_if_present(&mut self, field: &str, value: Option<&str>, max_len: usize) -> &mut Self {
        if let Some(value) = value {
            self.required(field, value, max_len);
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: Option<&str>, max_len: usize) -> &mut Self {
        if let Some(value) = value {
            if value.trim().chars().count() > max_len {
                self.push(field, ValidationError::TooLong(max_len));
            }
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, ValidationError::Required);
        } else if !is_valid_email(value.trim()) {
            self.push(field, ValidationError::InvalidEmail);
        }
        self
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.push(field, ValidationError::Required);
        } else if value.chars().count() < MIN_PASSWORD_LENGTH {
            self.push(field, ValidationError::TooShort(MIN_PASSWORD_LENGTH));
        }
        self
    }

    /// Points awarded or charged: 0..=MAX_POINTS
    pub fn points(&mut self, field: &str, value: i64) -> &mut Self {
        if !(0..=MAX_POINTS).contains(&value) {
            self.push(field, ValidationError::OutOfRange { min: 0.0, max: MAX_POINTS as f64 });
        }
        self
    }

    /// Points on a ledger adjustment may be negative
    pub fn signed_points(&mut self, field: &str, value: i64) -> &mut Self {
        if !(-MAX_POINTS..=MAX_POINTS).contains(&value) {
            self.push(field, ValidationError::OutOfRange {
                min: -(MAX_POINTS as f64),
                max: MAX_POINTS as f64,
            });
        }
        self
    }

    pub fn money(&mut self, field: &str, value: f64) -> &mut Self {
        if !value.is_finite() || !(0.0..=MAX_MONEY).contains(&value) {
            self.push(field, ValidationError::OutOfRange { min: 0.0, max: MAX_MONEY });
        } else if has_too_many_decimals(value) {
            self.push(field, ValidationError::TooManyDecimals);
        }
        self
    }

    pub fn signed_money(&mut self, field: &str, value: f64) -> &mut Self {
        if !value.is_finite() || !(-MAX_MONEY..=MAX_MONEY).contains(&value) {
            self.push(field, ValidationError::OutOfRange { min: -MAX_MONEY, max: MAX_MONEY });
        } else if has_too_many_decimals(value) {
            self.push(field, ValidationError::TooManyDecimals);
        }
        self
    }

    /// A `YYYY-MM-DD` date that is today or later
    pub fn due_date(&mut self, field: &str, value: Option<&str>, today: NaiveDate) -> &mut Self {
        if let Some(value) = value {
            match parse_date(value) {
                Some(date) if date < today => {
                    self.push(field, ValidationError::DateInPast);
                }
                Some(_) => {}
                None => {
                    self.push(field, ValidationError::InvalidDate);
                }
            }
        }
        self
    }

    /// An RFC 3339 timestamp that is not in the past
    pub fn future_timestamp(&mut self, field: &str, value: &str, now: DateTime<Utc>) -> &mut Self {
        match parse_timestamp(value) {
            Some(ts) if ts < now => {
                self.push(field, ValidationError::DateInPast);
            }
            Some(_) => {}
            None => {
                self.push(field, ValidationError::InvalidDate);
            }
        }
        self
    }

    pub fn timestamp(&mut self, field: &str, value: &str) -> &mut Self {
        if parse_timestamp(value).is_none() {
            self.push(field, ValidationError::InvalidDate);
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::<FixedOffset>::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn has_too_many_decimals(value: f64) -> bool {
    let cents = value * 100.0;
    (cents - cents.round()).abs() > 1e-6
}

pub fn validate_register(request: &RegisterRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required("household_name", &request.household_name, MAX_NAME_LENGTH)
        .required("name", &request.name, MAX_NAME_LENGTH)
        .email("email", &request.email)
        .password("password", &request.password);
    v.finish()
}

pub fn validate_login(request: &LoginRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    if request.email.trim().is_empty() {
        v.push("email", ValidationError::Required);
    }
    if request.password.is_empty() {
        v.push("password", ValidationError::Required);
    }
    v.finish()
}

pub fn validate_create_user(request: &CreateUserRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required("name", &request.name, MAX_NAME_LENGTH)
        .email("email", &request.email)
        .password("password", &request.password);
    v.finish()
}

pub fn validate_update_user(request: &UpdateUserRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required_if_present("name", request.name.as_deref(), MAX_NAME_LENGTH);
    if let Some(password) = &request.password {
        v.password("password", password);
    }
    v.finish()
}

pub fn validate_create_chore(request: &CreateChoreRequest, today: NaiveDate) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required("title", &request.title, MAX_TITLE_LENGTH)
        .max_length("description", Some(&request.description), MAX_DESCRIPTION_LENGTH)
        .points("points", request.points)
        .money("money_reward", request.money_reward)
        .due_date("due_date", request.due_date.as_deref(), today);
    v.finish()
}

pub fn validate_update_chore(request: &UpdateChoreRequest, today: NaiveDate) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required_if_present("title", request.title.as_deref(), MAX_TITLE_LENGTH)
        .max_length("description", request.description.as_deref(), MAX_DESCRIPTION_LENGTH)
        .due_date("due_date", request.due_date.as_deref(), today);
    if let Some(points) = request.points {
        v.points("points", points);
    }
    if let Some(money) = request.money_reward {
        v.money("money_reward", money);
    }
    v.finish()
}

/// A reward must cost something
pub fn validate_reward_costs(cost_points: i64, cost_money: f64) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.points("cost_points", cost_points).money("cost_money", cost_money);
    if v.is_valid() && cost_points == 0 && cost_money <= 0.0 {
        v.push("cost", ValidationError::NoCost);
    }
    v.finish()
}

pub fn validate_create_reward(request: &CreateRewardRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required("title", &request.title, MAX_TITLE_LENGTH)
        .max_length("description", Some(&request.description), MAX_DESCRIPTION_LENGTH);
    let mut errors = v.finish().err().unwrap_or_default();
    if let Err(cost_errors) = validate_reward_costs(request.cost_points, request.cost_money) {
        errors.extend(cost_errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_update_reward(request: &UpdateRewardRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required_if_present("title", request.title.as_deref(), MAX_TITLE_LENGTH)
        .max_length("description", request.description.as_deref(), MAX_DESCRIPTION_LENGTH);
    if let Some(points) = request.cost_points {
        v.points("cost_points", points);
    }
    if let Some(money) = request.cost_money {
        v.money("cost_money", money);
    }
    v.finish()
}

/// Start must parse; end, when given, must be after start
pub fn validate_event_window(starts_at: &str, ends_at: Option<&str>) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    let start = parse_timestamp(starts_at);
    if start.is_none() {
        v.push("starts_at", ValidationError::InvalidDate);
    }
    if let Some(ends_at) = ends_at {
        match (start, parse_timestamp(ends_at)) {
            (Some(start), Some(end)) if end <= start => {
                v.push("ends_at", ValidationError::EndBeforeStart);
            }
            (_, None) => {
                v.push("ends_at", ValidationError::InvalidDate);
            }
            _ => {}
        }
    }
    v.finish()
}

pub fn validate_create_event(request: &CreateEventRequest, now: DateTime<Utc>) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required("title", &request.title, MAX_TITLE_LENGTH)
        .max_length("description", Some(&request.description), MAX_DESCRIPTION_LENGTH)
        .max_length("location", request.location.as_deref(), MAX_TITLE_LENGTH)
        .future_timestamp("starts_at", &request.starts_at, now);
    if let Some(ends_at) = &request.ends_at {
        v.timestamp("ends_at", ends_at);
    }
    let mut errors = v.finish().err().unwrap_or_default();
    if errors.is_empty() {
        if let Err(window_errors) = validate_event_window(&request.starts_at, request.ends_at.as_deref()) {
            errors.extend(window_errors);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_update_event(request: &UpdateEventRequest, now: DateTime<Utc>) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required_if_present("title", request.title.as_deref(), MAX_TITLE_LENGTH)
        .max_length("description", request.description.as_deref(), MAX_DESCRIPTION_LENGTH)
        .max_length("location", request.location.as_deref(), MAX_TITLE_LENGTH);
    if let Some(starts_at) = &request.starts_at {
        v.future_timestamp("starts_at", starts_at, now);
    }
    if let Some(ends_at) = &request.ends_at {
        v.timestamp("ends_at", ends_at);
    }
    v.finish()
}

pub fn validate_create_transaction(request: &CreateTransactionRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    if request.user_id.trim().is_empty() {
        v.push("user_id", ValidationError::Required);
    }
    if !request.kind.is_manual() {
        v.push("kind", ValidationError::NotAllowed);
    }
    v.required("description", &request.description, MAX_DESCRIPTION_LENGTH)
        .signed_points("points", request.points)
        .signed_money("money", request.money);
    if v.is_valid() && request.points == 0 && request.money == 0.0 {
        v.push("amount", ValidationError::NothingToRecord);
    }
    v.finish()
}

pub fn validate_create_learning_task(request: &CreateLearningTaskRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required("title", &request.title, MAX_TITLE_LENGTH)
        .max_length("description", Some(&request.description), MAX_DESCRIPTION_LENGTH)
        .max_length("subject", request.subject.as_deref(), MAX_TITLE_LENGTH)
        .points("points", request.points);
    v.finish()
}

pub fn validate_update_learning_task(request: &UpdateLearningTaskRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.required_if_present("title", request.title.as_deref(), MAX_TITLE_LENGTH)
        .max_length("description", request.description.as_deref(), MAX_DESCRIPTION_LENGTH)
        .max_length("subject", request.subject.as_deref(), MAX_TITLE_LENGTH);
    if let Some(points) = request.points {
        v.points("points", points);
    }
    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransactionKind;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn chore_request() -> CreateChoreRequest {
        CreateChoreRequest {
            title: "Take out trash".to_string(),
            description: "Both bins".to_string(),
            points: 15,
            money_reward: 1.5,
            due_date: Some("2025-06-15".to_string()),
            assignee_id: None,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_chore_due_today() {
        assert!(validate_create_chore(&chore_request(), today()).is_ok());
    }

    #[test]
    fn test_chore_requires_title_and_future_date() {
        let mut request = chore_request();
        request.title = "   ".to_string();
        request.due_date = Some("2025-06-14".to_string());

        let errors = validate_create_chore(&request, today()).unwrap_err();
        assert_eq!(fields(&errors), vec!["title", "due_date"]);
        assert_eq!(errors[0].error, ValidationError::Required);
        assert_eq!(errors[1].error, ValidationError::DateInPast);
    }

    #[test]
    fn test_chore_rejects_bad_amounts() {
        let mut request = chore_request();
        request.points = -1;
        request.money_reward = 1.234;
        request.due_date = Some("June 20".to_string());

        let errors = validate_create_chore(&request, today()).unwrap_err();
        assert_eq!(fields(&errors), vec!["points", "money_reward", "due_date"]);
        assert_eq!(errors[1].error, ValidationError::TooManyDecimals);
        assert_eq!(errors[2].error, ValidationError::InvalidDate);
    }

    #[test]
    fn test_title_length_limit() {
        let mut request = chore_request();
        request.title = "x".repeat(MAX_TITLE_LENGTH + 1);
        let errors = validate_create_chore(&request, today()).unwrap_err();
        assert_eq!(errors[0].error, ValidationError::TooLong(MAX_TITLE_LENGTH));
    }

    #[test]
    fn test_register_validation() {
        let request = RegisterRequest {
            household_name: "The Smiths".to_string(),
            name: "Alex".to_string(),
            email: "alex@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        assert!(validate_register(&request).is_ok());

        let bad = RegisterRequest {
            email: "alex.example.com".to_string(),
            password: "short".to_string(),
            ..request
        };
        let errors = validate_register(&bad).unwrap_err();
        assert_eq!(fields(&errors), vec!["email", "password"]);
        assert_eq!(errors[1].error, ValidationError::TooShort(MIN_PASSWORD_LENGTH));
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b.co."));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b@c.co"));
    }

    #[test]
    fn test_reward_must_cost_something() {
        let request = CreateRewardRequest {
            title: "Movie night".to_string(),
            description: String::new(),
            cost_points: 0,
            cost_money: 0.0,
        };
        let errors = validate_create_reward(&request).unwrap_err();
        assert_eq!(errors, vec![FieldError { field: "cost".to_string(), error: ValidationError::NoCost }]);

        let priced = CreateRewardRequest { cost_money: 2.5, ..request };
        assert!(validate_create_reward(&priced).is_ok());
    }

    #[test]
    fn test_event_start_not_in_past() {
        let request = CreateEventRequest {
            title: "Zoo trip".to_string(),
            description: String::new(),
            location: None,
            starts_at: "2025-06-15T11:59:00Z".to_string(),
            ends_at: None,
        };
        let errors = validate_create_event(&request, now()).unwrap_err();
        assert_eq!(errors[0].error, ValidationError::DateInPast);

        let future = CreateEventRequest {
            starts_at: "2025-06-20T09:00:00-04:00".to_string(),
            ends_at: Some("2025-06-20T17:00:00-04:00".to_string()),
            ..request
        };
        assert!(validate_create_event(&future, now()).is_ok());
    }

    #[test]
    fn test_event_end_after_start() {
        let errors = validate_event_window("2025-06-20T10:00:00Z", Some("2025-06-20T09:00:00Z")).unwrap_err();
        assert_eq!(errors[0].error, ValidationError::EndBeforeStart);
        assert!(validate_event_window("2025-06-20T10:00:00Z", None).is_ok());
        assert!(validate_event_window("not a time", None).is_err());
    }

    #[test]
    fn test_transaction_validation() {
        let request = CreateTransactionRequest {
            user_id: "user::kid".to_string(),
            kind: TransactionKind::Allowance,
            description: "Weekly allowance".to_string(),
            points: 0,
            money: 5.0,
        };
        assert!(validate_create_transaction(&request).is_ok());

        let automatic = CreateTransactionRequest { kind: TransactionKind::ChoreReward, ..request.clone() };
        assert_eq!(validate_create_transaction(&automatic).unwrap_err()[0].error, ValidationError::NotAllowed);

        let empty = CreateTransactionRequest { money: 0.0, ..request.clone() };
        assert_eq!(validate_create_transaction(&empty).unwrap_err()[0].error, ValidationError::NothingToRecord);

        let deduction = CreateTransactionRequest { kind: TransactionKind::Adjustment, points: -20, money: 0.0, ..request };
        assert!(validate_create_transaction(&deduction).is_ok());
    }

    #[test]
    fn test_describe_errors() {
        let errors = vec![
            FieldError { field: "title".to_string(), error: ValidationError::Required },
            FieldError { field: "points".to_string(), error: ValidationError::OutOfRange { min: 0.0, max: 100.0 } },
        ];
        assert_eq!(describe_errors(&errors), "title is required; points must be between 0 and 100");
    }
}
