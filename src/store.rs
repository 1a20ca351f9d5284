//! Client for the remote user store (`/api/users`).

use crate::form::CreatePayload;
use crate::user::User;
use anyhow::{anyhow, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;

/// Everything outside the unreserved set of RFC 3986
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Trait for user stores to allow mocking and abstraction
pub trait UserStore {
    fn list(&self) -> Result<Vec<User>>;
    fn create(&self, payload: &CreatePayload) -> Result<User>;
    /// Returns `None` when the store accepted the update without echoing a record.
    fn update(&self, user: &User) -> Result<Option<User>>;
    fn delete(&self, id: &str) -> Result<()>;
}

pub struct HttpUserStore {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpUserStore {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn collection_url(&self) -> String {
        format!("{}/api/users", self.base_url)
    }

    pub fn item_url(&self, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(),
            utf8_percent_encode(id, PATH_SEGMENT)
        )
    }
}

fn into_error(err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            anyhow!("API error {}: {}", code, body)
        }
        e => anyhow!("Request failed: {}", e),
    }
}

impl UserStore for HttpUserStore {
    fn list(&self) -> Result<Vec<User>> {
        let resp = self
            .agent
            .get(&self.collection_url())
            .call()
            .map_err(into_error)?;
        let users: Vec<User> = resp.into_json()?;
        Ok(users)
    }

    fn create(&self, payload: &CreatePayload) -> Result<User> {
        let resp = self
            .agent
            .post(&self.collection_url())
            .send_json(serde_json::to_value(payload)?)
            .map_err(into_error)?;
        let user: User = resp.into_json()?;
        if user.id.is_empty() {
            return Err(anyhow!("Store response is missing the user id"));
        }
        Ok(user)
    }

    fn update(&self, user: &User) -> Result<Option<User>> {
        let resp = self
            .agent
            .put(&self.item_url(&user.id))
            .send_json(serde_json::to_value(user)?)
            .map_err(into_error)?;
        let body = resp.into_string()?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        // Some deployments answer with a status object instead of the record
        Ok(serde_json::from_str::<User>(&body)
            .ok()
            .filter(|u| !u.id.is_empty()))
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.agent
            .delete(&self.item_url(id))
            .call()
            .map_err(into_error)?;
        Ok(())
    }
}
