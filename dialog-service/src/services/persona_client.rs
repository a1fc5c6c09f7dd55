//! HTTP client for the Persona Engine.

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use service_core::observability::TracedClientExt;
use std::time::Duration;
use thiserror::Error;

use super::persona::{Persona, Trait};

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Persona engine unreachable: {0}")]
    Unavailable(String),

    #[error("Persona engine returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid persona payload: {0}")]
    InvalidResponse(String),

    #[error("Invalid persona engine URL: {0}")]
    InvalidUrl(String),
}

#[derive(Clone)]
pub struct PersonaClient {
    base_url: Url,
    client: Client,
}

#[derive(Serialize)]
struct CreatePersona<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
struct UpdateTrait<'a> {
    #[serde(rename = "trait")]
    trait_name: &'a str,
    value: f64,
}

impl PersonaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PersonaError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PersonaError::Unavailable(format!("HTTP client: {}", e)))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| PersonaError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PersonaError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self { base_url, client })
    }

    /// Base URL with `segments` appended, each percent-encoded as a single
    /// path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PersonaError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PersonaError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn persona_url(&self, user_id: &str) -> Result<Url, PersonaError> {
        // Dot segments would be dropped from the path and address the collection.
        if matches!(user_id, "." | "..") {
            return Err(PersonaError::InvalidUrl(format!("user id '{}'", user_id)));
        }
        self.endpoint(&["api", "personas", user_id])
    }

    /// Fetch and normalize a user's traits.
    ///
    /// An unknown user, or any other non-success answer, yields an empty
    /// persona so the dialog can proceed without enrichment. Only transport
    /// failures and unreadable payloads are errors.
    #[tracing::instrument(skip(self, request_id))]
    pub async fn get_persona(
        &self,
        user_id: &str,
        request_id: Option<&str>,
    ) -> Result<Persona, PersonaError> {
        let response = self
            .client
            .traced_get(self.persona_url(user_id)?.as_str())
            .request_id(request_id)
            .send()
            .await
            .map_err(|e| PersonaError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::info!("No persona stored for user, continuing without traits");
            return Ok(Persona::empty());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Failed to retrieve persona data");
            return Ok(Persona::empty());
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PersonaError::InvalidResponse(e.to_string()))?;

        let persona = Persona::from_json(&payload);
        tracing::debug!(traits = persona.len(), "Retrieved persona data");
        Ok(persona)
    }

    /// Create an empty persona. Succeeds if the persona already exists.
    #[tracing::instrument(skip(self, request_id))]
    pub async fn create_persona(
        &self,
        user_id: &str,
        request_id: Option<&str>,
    ) -> Result<(), PersonaError> {
        let response = self
            .client
            .traced_post(self.endpoint(&["api", "personas", ""])?.as_str())
            .request_id(request_id)
            .json(&CreatePersona { user_id })
            .send()
            .await
            .map_err(|e| PersonaError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Persona created");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if already_exists(status, &body) {
            tracing::info!("Persona already exists");
            return Ok(());
        }

        Err(PersonaError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    #[tracing::instrument(skip(self, request_id))]
    pub async fn update_trait(
        &self,
        user_id: &str,
        t: Trait,
        value: f64,
        request_id: Option<&str>,
    ) -> Result<(), PersonaError> {
        let response = self
            .client
            .traced_put(self.persona_url(user_id)?.as_str())
            .request_id(request_id)
            .json(&UpdateTrait {
                trait_name: t.name(),
                value,
            })
            .send()
            .await
            .map_err(|e| PersonaError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(PersonaError::Rejected {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }

    pub async fn health(&self) -> Result<(), PersonaError> {
        let response = self
            .client
            .traced_get(self.endpoint(&["health"])?.as_str())
            .send()
            .await
            .map_err(|e| PersonaError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PersonaError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

fn already_exists(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST && body.to_ascii_lowercase().contains("already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_counts_as_existing() {
        assert!(already_exists(StatusCode::CONFLICT, ""));
        assert!(already_exists(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Persona Already Exists"}"#
        ));
        assert!(!already_exists(StatusCode::BAD_REQUEST, "missing user_id"));
        assert!(!already_exists(StatusCode::INTERNAL_SERVER_ERROR, "already exists"));
    }

    fn client(base: &str) -> PersonaClient {
        PersonaClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let url = client("http://engine:5001/").persona_url("u1").unwrap();
        assert_eq!(url.as_str(), "http://engine:5001/api/personas/u1");

        let prefixed = client("http://gateway/engine/").persona_url("u1").unwrap();
        assert_eq!(prefixed.as_str(), "http://gateway/engine/api/personas/u1");
    }

    #[test]
    fn user_id_stays_one_path_segment() {
        let url = client("http://engine:5001").persona_url("alice#mallory/x?y=1").unwrap();

        assert_eq!(url.path(), "/api/personas/alice%23mallory%2Fx%3Fy=1");
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn dot_segments_are_rejected() {
        let client = client("http://engine:5001");
        assert!(matches!(client.persona_url(".."), Err(PersonaError::InvalidUrl(_))));
        assert!(matches!(client.persona_url("."), Err(PersonaError::InvalidUrl(_))));
        assert!(client.persona_url("...").is_ok());
    }

    #[test]
    fn collection_and_health_urls() {
        let client = client("http://engine:5001/");
        assert_eq!(
            client.endpoint(&["api", "personas", ""]).unwrap().as_str(),
            "http://engine:5001/api/personas/"
        );
        assert_eq!(client.endpoint(&["health"]).unwrap().as_str(), "http://engine:5001/health");
        assert!(PersonaClient::new("not a url", Duration::from_secs(1)).is_err());
    }
}
