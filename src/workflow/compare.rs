//! Comparison pipeline: deconstruct, fan out, synthesize
//!
//! The request is split into independent search queries, each retrieved
//! concurrently, and the contexts are merged back in plan order before a
//! single synthesis call.

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::llm::{GenerateOptions, LlmRouter};
use crate::retrieval::{ContextRetriever, RetrievedContext};
use crate::types::{Citations, ModelChoice};
use crate::workflow::state::AggregatedContext;
use crate::workflow::RequestScope;

const PLAN_MAX_TOKENS: u32 = 500;
const SYNTHESIS_MAX_TOKENS: u32 = 1200;

/// Answer used when nothing comparable could be gathered
pub const NO_COMPARABLE_DATA_ANSWER: &str = "I could not find comparable data in the documents for this request, \
so no comparison can be made.";

#[derive(Debug, Deserialize)]
struct PlanReply {
    #[serde(default)]
    plan: Vec<String>,
}

/// Parse a `{"plan": [..]}` reply into sub-queries.
///
/// Anything that does not decode as an object with a list of strings gives
/// an empty plan. Blank and repeated entries are dropped so each sub-query
/// appears once.
pub fn parse_plan(reply: &str) -> Vec<String> {
    let body = strip_code_fence(reply);

    let decoded: PlanReply = match serde_json::from_str(body) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "comparison plan did not decode, using empty plan");
            return Vec::new();
        }
    };

    let mut plan: Vec<String> = Vec::with_capacity(decoded.plan.len());
    for entry in decoded.plan {
        let entry = entry.trim();
        if !entry.is_empty() && !plan.iter().any(|existing| existing == entry) {
            plan.push(entry.to_string());
        }
    }
    plan
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Splits a comparison request into simple search queries
#[derive(Clone)]
pub struct QueryDeconstructor {
    llm: LlmRouter,
}

impl QueryDeconstructor {
    const SYSTEM_PROMPT: &'static str = "You are an expert at deconstructing comparison questions.";

    pub fn new(llm: LlmRouter) -> Self {
        Self { llm }
    }

    pub async fn deconstruct(
        &self,
        scope: &RequestScope,
        question: &str,
        choice: ModelChoice,
    ) -> Result<Vec<String>> {
        let user_prompt = format!(
            "A user wants to compare things. Break their request into simple search queries. \
             Return a JSON object with a single key 'plan' containing a list of strings.\n\n\
             User Request: \"{}\"",
            question
        );

        let reply = self
            .llm
            .generate(
                scope,
                "deconstruct",
                choice,
                Self::SYSTEM_PROMPT,
                &user_prompt,
                GenerateOptions::new().json().max_tokens(PLAN_MAX_TOKENS),
            )
            .await?;

        let plan = parse_plan(&reply);
        info!(subqueries = plan.len(), "comparison plan built");
        Ok(plan)
    }
}

/// Retrieves every sub-query with bounded concurrency
#[derive(Clone)]
pub struct ComparisonRetriever {
    context: ContextRetriever,
    concurrency: usize,
}

impl ComparisonRetriever {
    pub fn new(context: ContextRetriever, concurrency: usize) -> Self {
        Self {
            context,
            concurrency: concurrency.max(1),
        }
    }

    /// Contexts keyed by sub-query in plan order, plus the union of citations
    pub async fn retrieve(
        &self,
        scope: &RequestScope,
        plan: &[String],
        choice: ModelChoice,
    ) -> Result<(AggregatedContext, Citations)> {
        // `buffered` yields in input order regardless of completion order.
        let results: Vec<Result<RetrievedContext>> = stream::iter(plan.iter())
            .map(|subquery| self.context.retrieve(scope, subquery, choice))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut aggregated = AggregatedContext::new();
        let mut citations = Citations::new();

        for (subquery, result) in plan.iter().zip(results) {
            let retrieved = result?;
            debug!(
                subquery = %subquery,
                chunks = retrieved.chunks_used,
                failed = retrieved.failed,
                "sub-query retrieved"
            );
            citations.extend_from(&retrieved.citations);
            aggregated.push(subquery.as_str(), retrieved.context);
        }

        Ok((aggregated, citations))
    }
}

/// Single comparative answer over all sub-query contexts
#[derive(Clone)]
pub struct ComparisonSynthesizer {
    llm: LlmRouter,
}

impl ComparisonSynthesizer {
    const SYSTEM_PROMPT: &'static str =
        "You are an expert analyst. Perform a detailed comparative analysis of the information provided.";

    pub fn new(llm: LlmRouter) -> Self {
        Self { llm }
    }

    /// Always returns a non-empty answer. An empty plan answers with
    /// `NO_COMPARABLE_DATA_ANSWER` without calling the model.
    pub async fn synthesize(
        &self,
        scope: &RequestScope,
        question: &str,
        aggregated: &AggregatedContext,
        choice: ModelChoice,
    ) -> Result<String> {
        if aggregated.is_empty() {
            info!("empty comparison plan, nothing to compare");
            return Ok(NO_COMPARABLE_DATA_ANSWER.to_string());
        }

        let user_prompt = build_synthesis_prompt(question, aggregated);

        let answer = self
            .llm
            .generate(
                scope,
                "synthesize",
                choice,
                Self::SYSTEM_PROMPT,
                &user_prompt,
                GenerateOptions::new().max_tokens(SYNTHESIS_MAX_TOKENS),
            )
            .await?;

        if answer.trim().is_empty() {
            return Ok(NO_COMPARABLE_DATA_ANSWER.to_string());
        }
        Ok(answer)
    }
}

fn build_synthesis_prompt(question: &str, aggregated: &AggregatedContext) -> String {
    let mut prompt = format!("User's Original Request: {}\n\n", question);

    for (subquery, context) in aggregated.iter() {
        prompt.push_str(&format!("--- Context for '{}' ---\n{}\n\n", subquery, context));
    }
    prompt.push_str(
        "--- Analysis Task ---\n\
         Provide a comprehensive comparison based ONLY on the contexts above. \
         Identify key similarities and differences. \
         If information is missing for any part of the comparison, state that explicitly.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{router, ScriptedModel};

    #[test]
    fn test_parse_plan() {
        assert_eq!(
            parse_plan(r#"{"plan": ["2017 report findings", "2021 report findings"]}"#),
            vec!["2017 report findings", "2021 report findings"]
        );
        assert_eq!(
            parse_plan("```json\n{\"plan\": [\"a\"]}\n```"),
            vec!["a"]
        );
        assert_eq!(parse_plan(r#"{"plan": ["a", " ", "a", "b"]}"#), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_plan_rejects_bad_shapes() {
        assert!(parse_plan("not json").is_empty());
        assert!(parse_plan(r#"{"steps": ["a"]}"#).is_empty());
        assert!(parse_plan(r#"{"plan": ["a", 3]}"#).is_empty());
        assert!(parse_plan(r#"{"plan": "a"}"#).is_empty());
        assert!(parse_plan(r#"["a", "b"]"#).is_empty());
        assert!(parse_plan("Error: Could not connect to the language model.").is_empty());
    }

    #[test]
    fn test_synthesis_prompt_blocks() {
        let mut aggregated = AggregatedContext::new();
        aggregated.push("2017", "Content: old\n\n");
        aggregated.push("2021", "");

        let prompt = build_synthesis_prompt("compare 2017 and 2021", &aggregated);
        assert!(prompt.contains("--- Context for '2017' ---\nContent: old\n\n"));
        assert!(prompt.contains("--- Context for '2021' ---\n\n\n"));
        assert!(prompt.find("'2017'") < prompt.find("'2021'"));
    }

    #[tokio::test]
    async fn test_deconstruct_requests_json() {
        let model = ScriptedModel::new(&[r#"{"plan": ["x", "y"]}"#]);
        let deconstructor = QueryDeconstructor::new(router(model.clone()));
        let scope = RequestScope::default();

        let plan = deconstructor
            .deconstruct(&scope, "compare x and y", ModelChoice::Primary)
            .await
            .unwrap();

        assert_eq!(plan, vec!["x", "y"]);
        let call = &model.calls()[0];
        assert!(call.options.json_mode);
        assert_eq!(call.options.max_tokens, Some(500));
    }

    #[tokio::test]
    async fn test_empty_synthesis_is_replaced() {
        let model = ScriptedModel::new(&[""]);
        let synthesizer = ComparisonSynthesizer::new(router(model.clone()));
        let scope = RequestScope::default();
        let mut aggregated = AggregatedContext::new();
        aggregated.push("x", "Content: x\n\n");

        let answer = synthesizer
            .synthesize(&scope, "compare x and y", &aggregated, ModelChoice::Primary)
            .await
            .unwrap();

        assert_eq!(answer, NO_COMPARABLE_DATA_ANSWER);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_plan_ignores_model() {
        let model = ScriptedModel::new(&["2021 had higher revenue than 2017."]);
        let synthesizer = ComparisonSynthesizer::new(router(model.clone()));
        let scope = RequestScope::default();

        let answer = synthesizer
            .synthesize(&scope, "compare 2017 and 2021", &AggregatedContext::new(), ModelChoice::Primary)
            .await
            .unwrap();

        assert_eq!(answer, NO_COMPARABLE_DATA_ANSWER);
        assert_eq!(model.call_count(), 0);
    }
}
