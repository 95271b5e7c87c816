use super::support::{pipeline, CountingEmbedder, Fixture};
use crate::rag::{AnswerQueue, APOLOGY_MESSAGE};
use crate::sync::SyncOptions;
use crate::vector_index::MemoryIndex;
use handbook_llm::MockLlmClient;
use handbook_prompt::NOT_FOUND_MESSAGE;
use std::sync::Arc;

const CORE_VALUES: &str = "Customers first. Own the outcome.";

/// Answers from the context when it mentions refunds, otherwise not found.
fn grounded_llm() -> MockLlmClient {
    MockLlmClient::with_responder(|request| {
        if request
            .prompt
            .contains("Content: Refunds must be approved within 48 hours.")
        {
            Ok("Refunds must be approved within 48 hours.\nSources: finance/general/refunds.txt"
                .to_string())
        } else {
            Ok(NOT_FOUND_MESSAGE.to_string())
        }
    })
}

#[tokio::test]
async fn test_answers_from_shared_document_with_citation() {
    let fixture = Fixture::new();
    fixture.write(
        "finance/general/refunds.txt",
        "Refunds must be approved within 48 hours.",
    );

    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(MemoryIndex::new("handbook"));
    fixture
        .orchestrator(embedder.clone(), index.clone())
        .run(SyncOptions::default())
        .await
        .unwrap();

    let llm = grounded_llm();
    let pipeline = pipeline(embedder, index, llm.clone(), CORE_VALUES);
    let answer = pipeline
        .handle_question("How long do refund approvals take?", Some(" Marketing "))
        .await;

    assert!(answer.contains("48 hours"));
    assert!(answer.contains("finance/general/refunds.txt"));

    let request = &llm.requests()[0];
    assert!(request.prompt.contains(CORE_VALUES));
    assert!(request.prompt.contains("Source: finance/general/refunds.txt"));
}

#[tokio::test]
async fn test_restricted_context_yields_not_found() {
    let fixture = Fixture::new();
    fixture.write(
        "finance/accountant/ledger.txt",
        "Refund ledger codes start with RF.",
    );

    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(MemoryIndex::new("handbook"));
    fixture
        .orchestrator(embedder.clone(), index.clone())
        .run(SyncOptions::default())
        .await
        .unwrap();

    let llm = grounded_llm();
    let pipeline = pipeline(embedder, index, llm.clone(), CORE_VALUES);
    let answer = pipeline
        .handle_question("What are the refund ledger codes?", Some("marketing"))
        .await;

    assert_eq!(answer, NOT_FOUND_MESSAGE);
    assert!(!llm.requests()[0].prompt.contains("RF."));
}

#[tokio::test]
async fn test_refund_question_without_visible_document_is_not_found() {
    let fixture = Fixture::new();
    fixture.write(
        "finance/accountant/refunds.txt",
        "Refunds must be approved within 48 hours.",
    );

    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(MemoryIndex::new("handbook"));
    fixture
        .orchestrator(embedder.clone(), index.clone())
        .run(SyncOptions::default())
        .await
        .unwrap();

    let llm = grounded_llm();
    let pipeline = pipeline(embedder, index, llm.clone(), CORE_VALUES);
    let answer = pipeline
        .handle_question("How long do refund approvals take?", Some("marketing"))
        .await;

    assert_eq!(answer, NOT_FOUND_MESSAGE);
    assert!(!llm.requests()[0].prompt.contains("48 hours"));
}

#[tokio::test]
async fn test_question_before_first_sync_is_not_found() {
    let llm = grounded_llm();
    let pipeline = pipeline(
        Arc::new(CountingEmbedder::new()),
        Arc::new(MemoryIndex::new("handbook")),
        llm.clone(),
        CORE_VALUES,
    );

    let answer = pipeline
        .handle_question("How long do refund approvals take?", None)
        .await;

    assert_eq!(answer, NOT_FOUND_MESSAGE);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_completion_failure_yields_apology() {
    let llm = MockLlmClient::failing(false);
    let pipeline = pipeline(
        Arc::new(CountingEmbedder::new()),
        Arc::new(MemoryIndex::new("handbook")),
        llm.clone(),
        CORE_VALUES,
    );

    let answer = pipeline.handle_question("Anything?", None).await;

    assert_eq!(answer, APOLOGY_MESSAGE);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_queue_answers_through_shared_pipeline() {
    let fixture = Fixture::new();
    fixture.write(
        "finance/general/refunds.txt",
        "Refunds must be approved within 48 hours.",
    );

    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(MemoryIndex::new("handbook"));
    fixture
        .orchestrator(embedder.clone(), index.clone())
        .run(SyncOptions::default())
        .await
        .unwrap();

    let pipeline = Arc::new(pipeline(embedder, index, grounded_llm(), CORE_VALUES));
    let queue = AnswerQueue::new(pipeline, 2);

    let first = queue.submit("How long do refunds take?", Some("sales".to_string()));
    let second = queue.submit("Who approves refunds?", None);

    assert!(first.wait().await.unwrap().contains("48 hours"));
    assert!(second.wait().await.unwrap().contains("48 hours"));
}
