//! RAG response types.

use serde::{Deserialize, Serialize};

/// Answer to one question with its sources in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    /// Generated answer, or the fallback answer in degraded mode
    pub answer: String,

    /// `source` of each retrieved passage, rank 0 first
    pub sources: Vec<String>,

    /// True when generation failed and `answer` is the fallback
    pub degraded: bool,
}

impl RagResponse {
    pub fn new(answer: String, sources: Vec<String>) -> Self {
        let degraded = crate::rag::generator::is_fallback(&answer);
        Self {
            answer,
            sources,
            degraded,
        }
    }

    /// `(answer, sources)` for callers that only need the pair.
    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.answer, self.sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::generator::fallback_answer;

    #[test]
    fn test_degraded_flag() {
        let ok = RagResponse::new("Rest and fluids.".to_string(), vec!["WHO".to_string()]);
        assert!(!ok.degraded);

        let degraded = RagResponse::new(fallback_answer(), vec!["WHO".to_string()]);
        assert!(degraded.degraded);
    }

    #[test]
    fn test_into_parts() {
        let response = RagResponse::new(
            "Rest.".to_string(),
            vec!["PubMed".to_string(), "unknown".to_string()],
        );

        let (answer, sources) = response.into_parts();
        assert_eq!(answer, "Rest.");
        assert_eq!(sources, vec!["PubMed", "unknown"]);
    }

    #[test]
    fn test_json_shape() {
        let response = RagResponse::new("A".to_string(), vec!["S".to_string()]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["answer"], "A");
        assert_eq!(json["sources"][0], "S");
        assert_eq!(json["degraded"], false);
    }
}
