use serde::{Deserialize, Serialize};

/// Entry of the curated model list served by `/models/curated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub downloads: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
}

impl CuratedModel {
    /// Case-insensitive match on name, description or any tag.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&term))
    }
}

/// Model already present on the serving host (`meta.json` written after a download)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedModel {
    pub id: String,
    #[serde(default)]
    pub repo_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default, rename = "downloadedAt")]
    pub downloaded_at: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub usage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest {
    pub repo_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadAccepted {
    #[serde(default)]
    pub ok: bool,
    pub job_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// `/models/jobs/{job_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadJob {
    pub repo_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub percent: u8,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tinyllama() -> CuratedModel {
        CuratedModel {
            id: "tinyllama".into(),
            name: "TinyLlama".into(),
            description: "A compact, efficient Llama model for quick prototyping.".into(),
            size: "1.1GB".into(),
            downloads: "12,345".into(),
            tags: vec!["llama".into(), "small".into(), "fast".into()],
            category: "llm".into(),
        }
    }

    #[test]
    fn test_search_matches_name_description_and_tags() {
        let model = tinyllama();
        assert!(model.matches("tiny"));
        assert!(model.matches("PROTOTYPING"));
        assert!(model.matches("fast"));
        assert!(model.matches(""));
        assert!(!model.matches("mistral"));
    }

    #[test]
    fn test_job_status_parsing() {
        let job: DownloadJob = serde_json::from_value(serde_json::json!({
            "repo_id": "TinyLlama/TinyLlama-1.1B-Chat-v1.0",
            "status": "running",
            "percent": 40,
            "error": null
        }))
        .unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(!job.status.is_finished());
        assert!(JobStatus::Error.is_finished());
    }
}
