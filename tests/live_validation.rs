use std::{env, sync::Arc};

use docrag::{
    answering::{AnswerRequest, OllamaAnsweringClient},
    config::Config,
    files::{FileRecord, InMemoryFileRegistry},
    processing::RagService,
    store::IndexedChunkStore,
};

fn ollama_url() -> String {
    env::var("OLLAMA_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "http://127.0.0.1:11434".to_string())
}

fn ollama_model() -> String {
    env::var("ANSWERING_MODEL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Config::default().answering_model)
}

#[tokio::test]
#[ignore = "Requires live Ollama"]
async fn live_ollama_generates_an_answer() {
    use docrag::answering::AnsweringClient;

    let client = OllamaAnsweringClient::new(ollama_url()).expect("client");
    let answer = client
        .generate_answer(AnswerRequest {
            question: "How long is the refund window?".into(),
            context: vec!["[Document 1] Refunds are accepted within 30 days.".into()],
            model: ollama_model(),
        })
        .await
        .expect("failed to request an answer from Ollama");
    assert!(!answer.trim().is_empty(), "answer should not be blank");
}

#[tokio::test]
#[ignore = "Requires live Ollama"]
async fn live_question_answering_over_ingested_file() {
    let dir = tempfile::tempdir().unwrap();
    let stored_path = dir.path().join("policy.txt");
    std::fs::write(
        &stored_path,
        "Refunds are accepted within 30 days of delivery for unopened items.",
    )
    .unwrap();

    let config = Config {
        answering_model: ollama_model(),
        ..Config::default()
    };
    let service = RagService::new(
        Arc::new(IndexedChunkStore::new(config.index_heap_bytes).unwrap()),
        Arc::new(InMemoryFileRegistry::new()),
        Box::new(OllamaAnsweringClient::new(ollama_url()).unwrap()),
        config,
    );
    service
        .upload(FileRecord {
            file_id: "live-1".into(),
            filename: "policy.txt".into(),
            media_type: "text/plain".into(),
            byte_size: 68,
            stored_path,
            uploaded_by: "admin@example.org".into(),
        })
        .await
        .expect("ingest");

    let outcome = service
        .answer_question("How many days do customers have to request refunds?", None)
        .await
        .expect("answer");
    assert_eq!(outcome.found_chunks, 1);
    assert_eq!(outcome.sources[0].file_name, "policy.txt");
    assert!(!outcome.answer.trim().is_empty());
}
