// Data structures shared by the consumer and the HTTP API

use serde::{Deserialize, Serialize};

// Result record published by the predictor and stored in `results`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryResult {
    pub id: String,
    pub delivery_time: f64,
}

// Status Response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub message: String,
}

// Error Response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delivery_result_deserialization() {
        let result: DeliveryResult =
            serde_json::from_value(json!({ "id": "order-42", "delivery_time": 17.5 })).unwrap();

        assert_eq!(result.id, "order-42");
        assert_eq!(result.delivery_time, 17.5);
    }

    #[test]
    fn test_delivery_result_accepts_integer_time() {
        let result: DeliveryResult =
            serde_json::from_str(r#"{"id":"order-7","delivery_time":30}"#).unwrap();
        assert_eq!(result.delivery_time, 30.0);
    }

    #[test]
    fn test_delivery_result_requires_id() {
        assert!(serde_json::from_str::<DeliveryResult>(r#"{"delivery_time":1.0}"#).is_err());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "Result not found: order-1".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({ "error": "Result not found: order-1" }));
    }
}
