use async_trait::async_trait;
use qa_types::{PrefsPatch, UserPrefs};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;

use super::{PrefsStore, StoreError};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Preference store that talks to a remote user-preference service.
///
/// The remote side offers no conditional write, so reputation updates use the
/// trait's read-compare-write fallback and can still race with other writers.
#[derive(Clone, Debug)]
pub struct HttpPrefsStore {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpPrefsStore {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            StoreError::Internal(format!("invalid preference service URL {}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Internal(format!(
                "preference service URL {} cannot carry a path",
                base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// `{base}/users/{user_id}/prefs`, with the id encoded as one segment.
    fn prefs_url(&self, user_id: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Internal(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["users", user_id, "prefs"]);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn remote_error(user_id: &str, resp: Response) -> StoreError {
        let status = resp.status();
        let message = resp
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response>".to_string());
        tracing::error!(
            "Preference service request for {} failed with status {}: {}",
            user_id,
            status,
            message
        );
        StoreError::Remote {
            status: status.as_u16(),
            message,
        }
    }

    /// Creates the record for a user the remote service does not know yet.
    async fn create_prefs(&self, user_id: &str, url: Url, patch: PrefsPatch) -> Result<UserPrefs, StoreError> {
        let mut prefs = UserPrefs::default();
        patch.apply(&mut prefs);
        tracing::debug!("No prefs stored for {}, creating them at {}", user_id, url);

        let resp = self
            .authorize(self.client.put(url))
            .json(&prefs)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(resp.json::<UserPrefs>().await?)
        } else {
            Err(Self::remote_error(user_id, resp).await)
        }
    }
}

#[async_trait]
impl PrefsStore for HttpPrefsStore {
    async fn get_prefs(&self, user_id: &str) -> Result<UserPrefs, StoreError> {
        let url = self.prefs_url(user_id)?;
        tracing::debug!("Fetching prefs for {} from {}", user_id, url);

        let resp = self.authorize(self.client.get(url)).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json::<UserPrefs>().await?),
            StatusCode::NOT_FOUND => {
                tracing::debug!("No prefs stored for {}, using defaults", user_id);
                Ok(UserPrefs::default())
            }
            _ => Err(Self::remote_error(user_id, resp).await),
        }
    }

    async fn update_prefs(&self, user_id: &str, patch: PrefsPatch) -> Result<UserPrefs, StoreError> {
        let url = self.prefs_url(user_id)?;
        tracing::debug!("Patching prefs for {} at {}", user_id, url);

        let resp = self
            .authorize(self.client.patch(url.clone()))
            .json(&patch)
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json::<UserPrefs>().await?),
            StatusCode::NOT_FOUND => self.create_prefs(user_id, url, patch).await,
            _ => Err(Self::remote_error(user_id, resp).await),
        }
    }
}
