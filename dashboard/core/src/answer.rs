use serde::Serialize;

/// Structured error body returned to API clients in place of a result set.
///
/// The field names are part of the wire contract with the dashboard
/// frontend and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorAnswer {
    #[serde(rename = "error")]
    pub error_message: String,
    pub action: String,
    pub description: String,
}

impl ErrorAnswer {
    pub fn new(
        error_message: impl Into<String>,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            error_message: error_message.into(),
            action: action.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorAnswer;

    #[test]
    fn serializes_with_frontend_field_names() {
        let answer = ErrorAnswer::new(
            "Could not connect to the Kubernetes cluster",
            "Is the current kubeconfig context valid?",
            "connection refused",
        );
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": "Could not connect to the Kubernetes cluster",
                "action": "Is the current kubeconfig context valid?",
                "description": "connection refused",
            })
        );
    }
}
