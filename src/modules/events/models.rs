use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

/// An event as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i32,
    /// Short title of the event
    pub title: String,
    /// Short teaser description
    pub short_description: String,
    /// Full event description
    pub detailed_description: String,
    /// City where the event takes place
    pub city: String,
    /// One or more days of the week, e.g. `["Monday", "Wednesday"]`
    #[sqlx(json)]
    pub days_of_week: Vec<String>,
    /// Cost of the event in USD
    pub cost_usd: f64,
    /// URL of the event picture
    pub picture_url: String,
}

/// Payload for creating an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCreate {
    pub title: String,
    pub short_description: String,
    pub detailed_description: String,
    pub city: String,
    pub days_of_week: Vec<String>,
    pub cost_usd: f64,
    pub picture_url: String,
}

/// Payload for a partial update. Absent (or null) fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub detailed_description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub days_of_week: Option<Vec<String>>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub message: String,
}

/// A validated event ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub short_description: String,
    pub detailed_description: String,
    pub city: String,
    pub days_of_week: Vec<String>,
    pub cost_usd: f64,
    pub picture_url: String,
}

/// Validated field changes for an existing event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub detailed_description: Option<String>,
    pub city: Option<String>,
    pub days_of_week: Option<Vec<String>>,
    pub cost_usd: Option<f64>,
    pub picture_url: Option<String>,
}

impl EventChanges {
    pub fn apply_to(self, event: &mut Event) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(short_description) = self.short_description {
            event.short_description = short_description;
        }
        if let Some(detailed_description) = self.detailed_description {
            event.detailed_description = detailed_description;
        }
        if let Some(city) = self.city {
            event.city = city;
        }
        if let Some(days_of_week) = self.days_of_week {
            event.days_of_week = days_of_week;
        }
        if let Some(cost_usd) = self.cost_usd {
            event.cost_usd = cost_usd;
        }
        if let Some(picture_url) = self.picture_url {
            event.picture_url = picture_url;
        }
    }
}

/// Field-level validation failures, one JSON object per field.
pub type FieldErrors = Vec<Value>;

impl EventCreate {
    pub fn validate(self) -> Result<NewEvent, FieldErrors> {
        let mut errors = FieldErrors::new();
        let cost_usd = check_cost(self.cost_usd, &mut errors);
        let picture_url = check_picture_url(&self.picture_url, &mut errors);

        match (cost_usd, picture_url) {
            (Some(cost_usd), Some(picture_url)) if errors.is_empty() => Ok(NewEvent {
                title: self.title,
                short_description: self.short_description,
                detailed_description: self.detailed_description,
                city: self.city,
                days_of_week: self.days_of_week,
                cost_usd,
                picture_url,
            }),
            _ => Err(errors),
        }
    }
}

impl EventUpdate {
    pub fn validate(self) -> Result<EventChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        let cost_usd = self.cost_usd.and_then(|cost| check_cost(cost, &mut errors));
        let picture_url = self
            .picture_url
            .as_deref()
            .and_then(|url| check_picture_url(url, &mut errors));

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(EventChanges {
            title: self.title,
            short_description: self.short_description,
            detailed_description: self.detailed_description,
            city: self.city,
            days_of_week: self.days_of_week,
            cost_usd,
            picture_url,
        })
    }
}

fn check_cost(cost: f64, errors: &mut FieldErrors) -> Option<f64> {
    if cost.is_finite() && cost >= 0.0 {
        Some(cost)
    } else {
        errors.push(json!({
            "field": "cost_usd",
            "error": "must be a number greater than or equal to 0",
        }));
        None
    }
}

/// Parse and normalise an absolute http(s) URL.
fn check_picture_url(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok().filter(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    });

    match parsed {
        Some(url) => Some(url.to_string()),
        None => {
            errors.push(json!({
                "field": "picture_url",
                "error": "must be an absolute http or https URL",
            }));
            None
        }
    }
}
