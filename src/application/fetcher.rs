//! # Multi-part Plan Fetcher
//!
//! Retrieves one logical plan from a completion endpoint whose responses may be cut
//! into parts. The first response may open with a `[k/n]` marker announcing `n` parts;
//! the fetcher then asks for each remaining part with the requirement, the parts so far
//! and a continuation instruction, and joins everything with one delimiter per boundary.

use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::application::archive::PlanArchive;
use crate::application::steps;
use crate::domain::errors::FetchError;
use crate::domain::traits::{CompletionRequest, LlmProvider};
use crate::domain::types::PlanPart;
use crate::strings::{logs, prompts};

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\s*(\d+)\s*/\s*(\d+)\s*\]").expect("valid marker regex"))
}

/// Splits a leading `[k/n]` marker off a response.
/// Returns `(k, n)` when present plus the content with the marker removed.
pub fn split_part_marker(raw: &str) -> (Option<(usize, usize)>, String) {
    let text = raw.trim_start();
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let first = first.trim();

    let Some(caps) = marker_regex().captures(first) else {
        return (None, raw.to_string());
    };
    let parsed = caps[1].parse::<usize>().ok().zip(caps[2].parse::<usize>().ok());
    let Some(marker) = parsed else {
        return (None, raw.to_string());
    };

    let remainder = first[caps[0].len()..].trim();
    let content = if remainder.is_empty() {
        rest.to_string()
    } else {
        format!("{}\n{}", remainder, rest)
    };
    (Some(marker), content)
}

/// One fetch request as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub requirement: String,
    pub model: String,
    pub llm_url: String,
    pub project_id: String,
}

#[derive(Clone)]
pub struct PlanFetcher {
    llm: Arc<dyn LlmProvider>,
    archive_dir: Option<PathBuf>,
    max_parts: usize,
}

impl PlanFetcher {
    pub fn new(llm: Arc<dyn LlmProvider>, max_parts: usize) -> Self {
        Self {
            llm,
            archive_dir: None,
            max_parts: max_parts.max(1),
        }
    }

    pub fn with_archive(mut self, dir: Option<PathBuf>) -> Self {
        self.archive_dir = dir;
        self
    }

    /// Fetches every part and returns the reassembled plan text.
    /// Any failed round aborts the whole fetch; partial plans are never returned.
    pub async fn fetch(&self, request: &PlanRequest) -> Result<String, FetchError> {
        let archive = self.archive(request);
        let parts = self.collect_parts(request, archive.as_ref()).await?;
        let contents: Vec<&str> = parts.iter().map(|p| p.content.as_str()).collect();
        let plan = steps::join_segments(&contents);

        if let Some(archive) = &archive {
            archive.record_complete(&plan).await;
        }
        tracing::info!(
            "Plan for project '{}' assembled from {} part(s), {} bytes",
            request.project_id,
            parts.len(),
            plan.len()
        );
        Ok(plan)
    }

    async fn collect_parts(
        &self,
        request: &PlanRequest,
        archive: Option<&PlanArchive>,
    ) -> Result<Vec<PlanPart>, FetchError> {
        let mut parts: Vec<PlanPart> = Vec::new();
        let mut history = String::new();
        let mut total = 1;
        let mut current = 0;

        while current < total {
            current += 1;
            let prompt = prompts::continuation_prompt(&request.requirement, &history, current, total);
            if let Some(archive) = archive {
                archive.record_request(current, total, &prompt).await;
            }

            tracing::info!("{}", logs::requesting_part(current, total));
            let completion = CompletionRequest::new(prompt)
                .with_model(&request.model)
                .with_endpoint(&request.llm_url);
            let raw = self
                .llm
                .completion(completion)
                .await
                .map_err(|e| FetchError::Upstream {
                    part: current,
                    message: e.to_string(),
                })?;
            if raw.trim().is_empty() {
                return Err(FetchError::EmptyResponse { part: current });
            }

            let (marker, content) = split_part_marker(&raw);
            if current == 1
                && let Some((_, announced)) = marker
            {
                if announced > self.max_parts {
                    tracing::warn!(
                        "Response announced {} parts, capping at {}",
                        announced,
                        self.max_parts
                    );
                }
                total = announced.clamp(1, self.max_parts);
            }

            let content = steps::trim_delimiters(&content);
            if let Some(archive) = archive {
                archive.record_part(current, total, &content).await;
            }
            history.push_str(&content);
            history.push_str("\n\n");
            parts.push(PlanPart {
                sequence_number: current,
                total_parts: total,
                content,
            });
        }

        Ok(parts)
    }

    fn archive(&self, request: &PlanRequest) -> Option<PlanArchive> {
        self.archive_dir
            .as_ref()
            .map(|dir| PlanArchive::new(dir.clone(), &request.project_id))
    }
}
