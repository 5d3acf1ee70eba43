use crate::adapter::AdapterError;

use reqwest::Response;
use url::Url;

use std::sync::LazyLock;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|err| {
            log::warn!("Falling back to default HTTP client: {err}");
            reqwest::Client::new()
        })
});

pub async fn http_request(url: &Url) -> Result<String, AdapterError> {
    let response = checked_get(url).await?;
    response.text().await.map_err(AdapterError::from)
}

async fn checked_get(url: &Url) -> Result<Response, AdapterError> {
    let response = HTTP_CLIENT.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        log::debug!("Depth service returned {status} for: {url}");
        return Err(AdapterError::Status(status.as_u16()));
    }

    Ok(response)
}
