//! Client for the emulator's management API

use crate::common::http_client;
use crate::error::{OfflineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CREATE_STATE_MACHINE_TARGET: &str = "AWSStepFunctions.CreateStateMachine";
const AMZ_JSON_1_0: &str = "application/x-amz-json-1.0";

/// Synthetic role ARN attached to state machines registered locally
pub fn dummy_role_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/DummyRole")
}

/// Operations the lifecycle needs from the emulator's management API
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Register a state machine and return its ARN
    async fn create_state_machine(
        &self,
        name: &str,
        definition: &str,
        role_arn: &str,
    ) -> Result<String>;
}

/// Speaks the AWS JSON 1.0 protocol to a running emulator
///
/// Requests are not signed; the emulator does not check signatures.
#[derive(Debug, Clone)]
pub struct HttpManagementApi {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStateMachineRequest<'a> {
    name: &'a str,
    definition: &'a str,
    role_arn: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStateMachineResponse {
    state_machine_arn: String,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl HttpManagementApi {
    /// Client for the API at `endpoint`, giving up on a request after `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(http_client(timeout)?, endpoint))
    }

    /// Client sending requests through a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ManagementApi for HttpManagementApi {
    async fn create_state_machine(
        &self,
        name: &str,
        definition: &str,
        role_arn: &str,
    ) -> Result<String> {
        let body = serde_json::to_vec(&CreateStateMachineRequest {
            name,
            definition,
            role_arn,
        })?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", CREATE_STATE_MACHINE_TARGET)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON_1_0)
            .body(body)
            .send()
            .await
            .map_err(|e| OfflineError::Registration {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let error: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let reason = match (error.error_type, error.message) {
                // `__type` may carry a namespace prefix: "com.amazonaws...#StateMachineAlreadyExists"
                (Some(kind), Some(message)) => {
                    format!("{}: {message}", kind.rsplit('#').next().unwrap_or(&kind))
                }
                (Some(kind), None) => kind,
                (None, Some(message)) => message,
                (None, None) => format!("HTTP {status}"),
            };
            return Err(OfflineError::Registration {
                name: name.to_string(),
                reason,
            });
        }

        let created: CreateStateMachineResponse = serde_json::from_str(&text)?;
        tracing::debug!("Created state machine {} as {}", name, created.state_machine_arn);
        Ok(created.state_machine_arn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{SilentServer, StubServer};

    #[test]
    fn test_dummy_role_arn() {
        assert_eq!(
            dummy_role_arn("101010101010"),
            "arn:aws:iam::101010101010:role/DummyRole"
        );
    }

    #[tokio::test]
    async fn test_create_state_machine() {
        let server = StubServer::respond(
            "200 OK",
            r#"{"stateMachineArn":"arn:aws:states:us-east-1:101010101010:stateMachine:Orders","creationDate":1672567200.0}"#,
        )
        .await;
        let api = HttpManagementApi::new(server.url.clone(), Duration::from_secs(5)).unwrap();

        let arn = api
            .create_state_machine(
                "Orders",
                r#"{"StartAt":"Done","States":{"Done":{"Type":"Succeed"}}}"#,
                "arn:aws:iam::101010101010:role/DummyRole",
            )
            .await
            .unwrap();

        assert_eq!(arn, "arn:aws:states:us-east-1:101010101010:stateMachine:Orders");

        let request = server.request().await;
        let lowercase = request.to_lowercase();
        assert!(lowercase.contains("x-amz-target: awsstepfunctions.createstatemachine"));
        assert!(lowercase.contains("content-type: application/x-amz-json-1.0"));

        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["name"], "Orders");
        assert_eq!(body["roleArn"], "arn:aws:iam::101010101010:role/DummyRole");
        assert_eq!(
            body["definition"],
            r#"{"StartAt":"Done","States":{"Done":{"Type":"Succeed"}}}"#
        );
    }

    #[tokio::test]
    async fn test_create_state_machine_rejected() {
        let server = StubServer::respond(
            "400 Bad Request",
            r#"{"__type":"com.amazonaws.swf.service.v2.model#StateMachineAlreadyExists","message":"State Machine Already Exists"}"#,
        )
        .await;
        let api = HttpManagementApi::new(server.url.clone(), Duration::from_secs(5)).unwrap();

        let err = api
            .create_state_machine("Orders", "{}", "arn:aws:iam::1:role/DummyRole")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to register state machine 'Orders': StateMachineAlreadyExists: State Machine Already Exists"
        );
    }

    #[tokio::test]
    async fn test_unresponsive_api_times_out() {
        let server = SilentServer::start().await;
        let api = HttpManagementApi::new(server.url.clone(), Duration::from_millis(200)).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            api.create_state_machine("Orders", "{}", "arn:aws:iam::1:role/DummyRole"),
        )
        .await
        .expect("request should give up on its own");

        let err = result.unwrap_err();
        assert!(matches!(err, OfflineError::Registration { ref name, .. } if name == "Orders"));
    }
}
