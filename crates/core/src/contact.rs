//! Contact form submissions.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::document::id::{Collection, Partition};
use crate::document::validate::ValidationErrors;
use crate::error::CmsResult;
use crate::sanitize::clean_text;
use crate::store::{ContentStore, StoreError};

const MAX_NAME_LEN: usize = 100;
const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub received: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageBody {
    name: String,
    email: String,
    subject: String,
    message: String,
}

fn check_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(field, format!("cannot exceed {max} characters"));
    }
}

impl ContactForm {
    /// Sanitize every field and check the form is complete.
    pub fn clean(self) -> Result<ContactForm, ValidationErrors> {
        let form = ContactForm {
            name: clean_text(&self.name),
            email: clean_text(&self.email).to_ascii_lowercase(),
            subject: clean_text(&self.subject),
            message: clean_text(&self.message),
        };

        let mut errors = ValidationErrors::default();
        if form.name.is_empty() {
            errors.push("name", "is required");
        }
        if form.email.is_empty() {
            errors.push("email", "is required");
        } else if !EMAIL.is_match(&form.email) {
            errors.push("email", "is not a valid address");
        }
        if form.message.is_empty() {
            errors.push("message", "is required");
        }
        check_len(&mut errors, "name", &form.name, MAX_NAME_LEN);
        check_len(&mut errors, "subject", &form.subject, MAX_SUBJECT_LEN);
        check_len(&mut errors, "message", &form.message, MAX_MESSAGE_LEN);

        errors.into_result().map(|()| form)
    }
}

#[derive(Clone)]
pub struct ContactService {
    store: Arc<dyn ContentStore>,
}

impl ContactService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn submit(&self, form: ContactForm) -> CmsResult<ContactMessage> {
        let form = form.clean()?;
        let body = MessageBody {
            name: form.name,
            email: form.email,
            subject: form.subject,
            message: form.message,
        };
        let Value::Object(map) =
            serde_json::to_value(&body).map_err(|e| StoreError::Corrupt(e.to_string()))?
        else {
            return Err(StoreError::Corrupt("message body is not an object".to_string()).into());
        };

        let id = Uuid::now_v7().to_string();
        let stored = self
            .store
            .write(Partition::Live, Collection::Messages, &id, map)
            .await?;
        info!(message = %id, "contact message received");
        Ok(to_message(stored.id, stored.body, stored.created_at)?)
    }

    /// Received messages, newest first.
    pub async fn list(&self) -> CmsResult<Vec<ContactMessage>> {
        let mut messages = self
            .store
            .list(Partition::Live, Collection::Messages)
            .await?
            .into_iter()
            .map(|doc| to_message(doc.id, doc.body, doc.created_at))
            .collect::<Result<Vec<_>, _>>()?;
        messages.sort_by(|a, b| b.received.cmp(&a.received));
        Ok(messages)
    }
}

fn to_message(id: String, body: Map<String, Value>, received: DateTime<Utc>) -> Result<ContactMessage, StoreError> {
    let body: MessageBody = serde_json::from_value(Value::Object(body))
        .map_err(|e| StoreError::Corrupt(format!("message '{id}': {e}")))?;
    Ok(ContactMessage {
        id,
        name: body.name,
        email: body.email,
        subject: body.subject,
        message: body.message,
        received,
    })
}
