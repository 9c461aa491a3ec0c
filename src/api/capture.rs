use super::PipelineApi;
use crate::core::errors::ApiError;
use reqwest::Method;
use serde_json::{json, Value};

/// Capture locations with their live system information.
pub async fn capture_locations(api: &dyn PipelineApi) -> Result<Value, ApiError> {
    api.get("/capture/locations/", &Vec::new()).await
}

pub async fn toggle_capturing(api: &dyn PipelineApi, camera_id: u64) -> Result<Value, ApiError> {
    api.send(
        Method::POST,
        "/capture/toggle_capturing/",
        json!({ "camera_id": camera_id }),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeApi;
    use super::*;

    #[tokio::test]
    async fn test_toggle_capturing_body() {
        let api = FakeApi::new(Value::Null);
        toggle_capturing(&api, 21).await.unwrap();

        let call = &api.calls()[0];
        assert_eq!(call.path, "/capture/toggle_capturing/");
        assert_eq!(call.body, Some(json!({"camera_id": 21})));
    }
}
