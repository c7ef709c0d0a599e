//! Property tests for context assembly and comparison fan-out

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

use common::*;
use docquery::retrieval::{assemble_context, RetrievedChunk};
use docquery::types::ModelChoice;
use docquery::workflow::{ComparisonRetriever, RequestScope};

/// (source index, content, distance in thousandths)
type RawChunk = (u8, String, u16);

fn to_chunks(raw: Vec<RawChunk>) -> Vec<RetrievedChunk> {
    raw.into_iter()
        .enumerate()
        .map(|(i, (source, content, distance))| {
            RetrievedChunk::new(
                format!("doc{}.pdf", source % 6),
                format!("c{}", i),
                content,
                f64::from(distance) / 1000.0,
            )
        })
        .collect()
}

#[quickcheck]
fn context_stays_within_budget(raw: Vec<RawChunk>, max_chars: u16) -> bool {
    let max_chars = usize::from(max_chars);
    let (context, _, _) = assemble_context(to_chunks(raw), 25, 4, max_chars);
    context.chars().count() <= max_chars
}

#[quickcheck]
fn citations_are_unique_and_come_from_used_chunks(raw: Vec<RawChunk>, max_chars: u16) -> bool {
    let chunks = to_chunks(raw);
    let sources: HashSet<String> = chunks.iter().map(|c| c.source_id.clone()).collect();
    let (_, citations, used) = assemble_context(chunks, 25, 4, usize::from(max_chars));

    let unique: HashSet<&String> = citations.iter().collect();
    unique.len() == citations.len()
        && citations.iter().all(|c| sources.contains(c))
        && citations.len() <= used
}

#[quickcheck]
fn selection_respects_top_k_and_document_limit(raw: Vec<RawChunk>, top_k: u8, top_documents: u8) -> TestResult {
    if top_k == 0 || top_documents == 0 {
        return TestResult::discard();
    }
    let top_k = usize::from(top_k % 30) + 1;
    let top_documents = usize::from(top_documents % 6) + 1;

    let (context, citations, used) = assemble_context(to_chunks(raw), top_k, top_documents, usize::MAX);

    TestResult::from_bool(
        used <= top_k
            && citations.len() <= top_documents
            && context.matches("Content: ").count() >= used,
    )
}

#[quickcheck]
fn aggregated_keys_follow_plan(plan: Vec<String>, delays: Vec<u8>) -> TestResult {
    let mut seen = HashSet::new();
    let plan: Vec<String> = plan
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .take(8)
        .collect();
    if plan.is_empty() {
        return TestResult::discard();
    }

    let mut retriever = FakeRetriever::new();
    for (i, subquery) in plan.iter().enumerate() {
        let delay = delays.get(i).copied().unwrap_or(0) % 20;
        retriever = retriever
            .with(subquery, vec![chunk(&format!("s{}.pdf", i), subquery, 0.1)])
            .with_delay(subquery, Duration::from_millis(u64::from(delay)));
    }
    let fan_out = ComparisonRetriever::new(context_retriever(Arc::new(retriever)), 3);
    let scope = RequestScope::default();

    let result = tokio_test::block_on(fan_out.retrieve(&scope, &plan, ModelChoice::Primary));

    match result {
        Ok((aggregated, citations)) => {
            let expected: Vec<String> = (0..plan.len()).map(|i| format!("s{}.pdf", i)).collect();
            TestResult::from_bool(aggregated.matches_plan(&plan) && citations.as_slice() == expected.as_slice())
        }
        Err(_) => TestResult::failed(),
    }
}
