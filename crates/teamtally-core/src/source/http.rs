//! Blocking JSON GET helper shared by the HTTP sources.

use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::runtime::{Builder, Runtime};
use url::Url;

use crate::error::SourceError;

pub(crate) enum Auth<'a> {
    Bearer(&'a str),
    None,
}

pub(crate) struct BlockingClient {
    runtime: Runtime,
    client: Client,
    base: Url,
}

impl BlockingClient {
    pub(crate) fn new(base_url: &str) -> Result<Self, SourceError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SourceError::Runtime)?;
        Ok(Self {
            runtime,
            client: Client::new(),
            base,
        })
    }

    /// GET `endpoint` (relative to the base URL) and decode the JSON body.
    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        auth: Auth<'_>,
    ) -> Result<T, SourceError> {
        let url = self.base.join(endpoint)?;
        let mut request = self.client.get(url).query(query);
        if let Auth::Bearer(token) = auth {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        self.runtime.block_on(async {
            let resp = request
                .send()
                .await
                .map_err(|e| SourceError::http(endpoint, e))?;

            if !resp.status().is_success() {
                return Err(SourceError::Status {
                    endpoint: endpoint.to_string(),
                    status: resp.status().as_u16(),
                });
            }

            let body: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| SourceError::http(endpoint, e))?;
            serde_json::from_value(body).map_err(|e| SourceError::decode(endpoint, e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let client = BlockingClient::new("https://api.trello.com/1").unwrap();
        assert_eq!(
            client.base.join("boards/abc/actions").unwrap().as_str(),
            "https://api.trello.com/1/boards/abc/actions"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            BlockingClient::new("not a url"),
            Err(SourceError::InvalidUrl(_))
        ));
    }
}
