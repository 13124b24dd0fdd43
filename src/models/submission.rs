use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::email::NormalizedEmail;

/// Raw dealer application form as posted by the website
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(rename = "type")]
    pub dealer_type: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub message: Option<String>,
    pub activity_name: Option<String>,
    pub activity_type: Option<String>,
}

/// Kind of applicant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealerType {
    Individual,
    Business,
}

impl DealerType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(DealerType::Individual),
            "business" => Some(DealerType::Business),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealerType::Individual => "individual",
            DealerType::Business => "business",
        }
    }

    /// Label shown to the operator reading the notification
    pub fn label(&self) -> &'static str {
        match self {
            DealerType::Individual => "Privato",
            DealerType::Business => "Azienda",
        }
    }
}

/// A submission that passed every validation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub dealer_type: DealerType,
    pub name: String,
    pub email: NormalizedEmail,
    pub phone: String,
    pub address: String,
    pub message: Option<String>,
    pub activity_name: Option<String>,
    pub activity_type: Option<String>,
}

/// Trimmed value, `None` when absent or blank
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SubmissionRequest {
    /// Validates in order: required fields, applicant type, email. First failure wins.
    pub fn validate(&self) -> Result<Submission> {
        let (Some(dealer_type), Some(name), Some(email), Some(phone), Some(address)) = (
            present(&self.dealer_type),
            present(&self.name),
            present(&self.email),
            present(&self.phone),
            present(&self.address),
        ) else {
            return Err(AppError::MissingFields);
        };

        let dealer_type = DealerType::parse(dealer_type).ok_or(AppError::InvalidType)?;
        let email = NormalizedEmail::parse(email)?;

        Ok(Submission {
            dealer_type,
            name: name.to_string(),
            email,
            phone: phone.to_string(),
            address: address.to_string(),
            message: present(&self.message).map(str::to_string),
            activity_name: present(&self.activity_name).map(str::to_string),
            activity_type: present(&self.activity_type).map(str::to_string),
        })
    }
}

/// Body returned for a handled submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> SubmissionRequest {
        serde_json::from_value(value).expect("deserialize request")
    }

    fn business() -> serde_json::Value {
        json!({
            "type": "business",
            "name": "Mario Rossi",
            "email": "Mario.Rossi+test@GMAIL.com",
            "phone": "3331234567",
            "address": "Via Roma 1",
            "activityName": "Bar Roma",
            "activityType": "bar"
        })
    }

    #[test]
    fn test_valid_business_submission() {
        let submission = request(business()).validate().expect("valid");

        assert_eq!(submission.dealer_type, DealerType::Business);
        assert_eq!(submission.name, "Mario Rossi");
        assert_eq!(submission.email.as_str(), "mariorossi@gmail.com");
        assert_eq!(submission.activity_name.as_deref(), Some("Bar Roma"));
        assert_eq!(submission.activity_type.as_deref(), Some("bar"));
        assert_eq!(submission.message, None);
    }

    #[test]
    fn test_each_required_field_is_checked() {
        for field in ["type", "name", "email", "phone", "address"] {
            let mut missing = business();
            missing.as_object_mut().expect("object").remove(field);
            assert!(
                matches!(request(missing).validate(), Err(AppError::MissingFields)),
                "missing {field}"
            );

            let mut blank = business();
            blank[field] = json!("   ");
            assert!(
                matches!(request(blank).validate(), Err(AppError::MissingFields)),
                "blank {field}"
            );
        }
    }

    #[test]
    fn test_missing_fields_checked_before_type() {
        let result = request(json!({ "type": "associazione", "name": "Mario" })).validate();
        assert!(matches!(result, Err(AppError::MissingFields)));
    }

    #[test]
    fn test_invalid_type() {
        for dealer_type in ["associazione", "Business", "privato"] {
            let mut payload = business();
            payload["type"] = json!(dealer_type);
            assert!(matches!(
                request(payload).validate(),
                Err(AppError::InvalidType)
            ));
        }
    }

    #[test]
    fn test_type_checked_before_email() {
        let mut payload = business();
        payload["type"] = json!("associazione");
        payload["email"] = json!("not-an-email");
        assert!(matches!(
            request(payload).validate(),
            Err(AppError::InvalidType)
        ));
    }

    #[test]
    fn test_invalid_email() {
        for email in ["mario.rossi", "mario@localhost", "mario@[10.0.0.1]"] {
            let mut payload = business();
            payload["email"] = json!(email);
            assert!(matches!(
                request(payload).validate(),
                Err(AppError::InvalidEmail)
            ));
        }
    }

    #[test]
    fn test_blank_optional_fields_are_absent() {
        let mut payload = business();
        payload["type"] = json!("individual");
        payload["message"] = json!("  ");
        payload["activityName"] = json!("");
        payload.as_object_mut().expect("object").remove("activityType");

        let submission = request(payload).validate().expect("valid");
        assert_eq!(submission.dealer_type, DealerType::Individual);
        assert_eq!(submission.message, None);
        assert_eq!(submission.activity_name, None);
        assert_eq!(submission.activity_type, None);
    }

    #[test]
    fn test_response_serialization() {
        let response = SendEmailResponse {
            success: true,
            message: None,
            message_id: Some("<abc@sobrio30.it>".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&response).expect("serialize"),
            json!({ "success": true, "messageId": "<abc@sobrio30.it>" })
        );
    }
}
