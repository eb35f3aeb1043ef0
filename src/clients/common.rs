// cartela/src/clients/common.rs
// JSON request helpers and the mapping from HTTP failures back to game errors.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthorizationError, GameError, InputError};
use crate::server::RETAILER_HEADER;

/// Error body returned by the billing server
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub kind: String,
}

/// Turn a non-success status and its body into the matching error.
pub fn error_from_status(status: StatusCode, body: &str) -> GameError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| format!("HTTP request failed with status: {status}"));

    match status {
        StatusCode::UNAUTHORIZED => AuthorizationError::NotLoggedIn.into(),
        StatusCode::FORBIDDEN => AuthorizationError::InsufficientRole.into(),
        StatusCode::PAYMENT_REQUIRED => GameError::Balance(message),
        StatusCode::BAD_REQUEST => InputError::InvalidGameData(message).into(),
        _ => GameError::Network(message),
    }
}

async fn decode<U: DeserializeOwned>(response: reqwest::Response) -> Result<U, GameError> {
    let status = response.status();
    if status.is_success() {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GameError::Data(format!("Malformed response: {e}")))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(error_from_status(status, &text))
    }
}

/// GET with the retailer header
pub async fn get_json<U>(client: &reqwest::Client, url: &str, retailer_id: &str) -> Result<U, GameError>
where
    U: DeserializeOwned,
{
    let response = client.get(url).header(RETAILER_HEADER, retailer_id).send().await?;
    decode(response).await
}

/// POST a JSON body with the retailer header
pub async fn post_json<T, U>(client: &reqwest::Client, url: &str, body: &T, retailer_id: &str) -> Result<U, GameError>
where
    T: Serialize + ?Sized,
    U: DeserializeOwned,
{
    let response = client
        .post(url)
        .header(RETAILER_HEADER, retailer_id)
        .json(body)
        .send()
        .await?;
    decode(response).await
}
