//! Uniform response envelope

use serde::Serialize;

use crate::error::ApiResult;

/// Wire shape of every result handed to a view: `{success, data}` or `{success, error}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<ApiResult<T>> for ApiResponse<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let response: ApiResponse<u32> = Ok(7).into();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "data": 7})
        );
    }

    #[test]
    fn test_failure_shape() {
        let response: ApiResponse<u32> = Err(ClientError::Network).into();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": false, "error": "Network error. Please try again."})
        );
    }
}
