//! Hybrid retrieval behavior over in-memory stores and a fixture provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use index_store::{GenerationPayload, IndexStore, MemoryIndexStore, RepoId};
use llm_service::{Embedding, EmbeddingModel, LlmError};
use php_indexer::{Symbol, SymbolKind};
use retriever::{Retriever, RetrieverConfig, RetrieveError, SourceOrigin};
use services::{CancelSource, CancelToken};
use source_access::{InMemoryProvider, SnippetFetcher};
use vector_store::{ChunkKey, MemoryVectorStore, VectorRecord, VectorStore};

const COMMIT: &str = "1111111111111111111111111111111111111111";

/// Deterministic bag-of-topics embedder: one axis per topic word.
struct TopicEmbedder;

#[async_trait]
impl EmbeddingModel for TopicEmbedder {
    fn dimension(&self) -> usize {
        4
    }

    async fn embed(&self, text: &str) -> Result<Embedding, LlmError> {
        let t = text.to_lowercase();
        let axes = ["auth", "payment", "invoice", "queue"];
        let mut vector: Vec<f32> = axes
            .iter()
            .map(|axis| if t.contains(axis) { 1.0 } else { 0.0 })
            .collect();
        if vector.iter().all(|v| *v == 0.0) {
            vector[3] = 0.1;
        }
        Ok(Embedding {
            vector,
            token_count: (text.len() / 4) as u64,
        })
    }
}

fn symbol(file: &str, name: &str, qualified: &str, start: u32, end: u32) -> Symbol {
    Symbol {
        file: file.to_string(),
        name: name.to_string(),
        qualified_name: qualified.to_string(),
        kind: SymbolKind::Class,
        start_line: start,
        end_line: end,
        signature: None,
        docstring: None,
        parent_symbol: None,
        visibility: None,
        is_static: false,
    }
}

fn record(file: &str, start: u32, end: u32, qualified: &str, vector: Vec<f32>) -> VectorRecord {
    VectorRecord {
        key: ChunkKey {
            file: file.to_string(),
            start_line: start,
            end_line: end,
        },
        vector,
        kind: SymbolKind::Class,
        qualified_name: qualified.to_string(),
    }
}

async fn fixture() -> (Retriever, RepoId, Arc<InMemoryProvider>) {
    let repo = RepoId::new("acme", "shop");

    let index = Arc::new(MemoryIndexStore::new());
    index.upsert_repository(&repo, "main").await.unwrap();
    let mut payload = GenerationPayload::default();
    payload.upsert_symbol(symbol(
        "app/Http/Middleware/Authenticate.php",
        "Authenticate",
        "App\\Http\\Middleware\\Authenticate",
        1,
        25,
    ));
    payload.upsert_symbol(symbol(
        "app/Services/PaymentGateway.php",
        "PaymentGateway",
        "App\\Services\\PaymentGateway",
        5,
        60,
    ));
    index
        .replace_all_for_repo(&repo, COMMIT, payload)
        .await
        .unwrap();

    let vectors = Arc::new(MemoryVectorStore::new(4));
    vectors
        .upsert_vectors(
            &repo,
            vec![
                record(
                    "app/Http/Middleware/Authenticate.php",
                    1,
                    25,
                    "App\\Http\\Middleware\\Authenticate",
                    vec![1.0, 0.0, 0.0, 0.0],
                ),
                record(
                    "app/Http/Kernel.php",
                    40,
                    55,
                    "App\\Http\\Kernel",
                    vec![0.9, 0.0, 0.0, 0.1],
                ),
                record(
                    "app/Services/PaymentGateway.php",
                    5,
                    60,
                    "App\\Services\\PaymentGateway",
                    vec![0.0, 1.0, 0.0, 0.0],
                ),
            ],
        )
        .await
        .unwrap();

    let provider = Arc::new(InMemoryProvider::new());
    provider
        .put_file(
            &repo,
            COMMIT,
            "app/Http/Middleware/Authenticate.php",
            &"middleware line\n".repeat(30),
        )
        .await;
    provider
        .put_file(&repo, COMMIT, "app/Http/Kernel.php", &"kernel line\n".repeat(60))
        .await;
    provider
        .put_file(
            &repo,
            COMMIT,
            "app/Services/PaymentGateway.php",
            &"payment line\n".repeat(70),
        )
        .await;

    let snippets = Arc::new(SnippetFetcher::new(
        provider.clone(),
        Duration::from_secs(3600),
        500,
    ));

    let retriever = Retriever::new(
        index,
        vectors,
        snippets,
        Arc::new(TopicEmbedder),
        RetrieverConfig::default(),
    );
    (retriever, repo, provider)
}

#[tokio::test]
async fn merges_legs_and_numbers_sources_from_one() {
    let (retriever, repo, _provider) = fixture().await;

    let out = retriever
        .retrieve(&repo, COMMIT, "How does authentication work?", &CancelToken::never())
        .await
        .unwrap();

    assert!(!out.sources.is_empty());
    let indices: Vec<usize> = out.sources.iter().map(|s| s.source_index).collect();
    assert_eq!(indices, (1..=out.sources.len()).collect::<Vec<_>>());

    // The middleware class matched both legs and merged into one source.
    let auth: Vec<_> = out
        .sources
        .iter()
        .filter(|s| s.file == "app/Http/Middleware/Authenticate.php" && s.start_line == 1)
        .collect();
    assert_eq!(auth.len(), 1);
    assert_eq!(auth[0].source_type, SourceOrigin::Both);
    assert!(auth[0].content.contains("middleware line"));
    assert!(out.embedding_tokens > 0);
}

#[tokio::test]
async fn top_source_tracks_query_topic() {
    let (retriever, repo, _provider) = fixture().await;

    let out = retriever
        .retrieve(
            &repo,
            COMMIT,
            "Where is the payment gateway charge implemented?",
            &CancelToken::never(),
        )
        .await
        .unwrap();
    assert_eq!(out.sources[0].file, "app/Services/PaymentGateway.php");
    assert!(out.sources[0].content.contains("payment line"));
}

#[tokio::test]
async fn retrieval_is_deterministic_for_fixed_inputs() {
    let (retriever, repo, _provider) = fixture().await;

    let a = retriever
        .retrieve(&repo, COMMIT, "How does authentication work?", &CancelToken::never())
        .await
        .unwrap();
    let b = retriever
        .retrieve(&repo, COMMIT, "How does authentication work?", &CancelToken::never())
        .await
        .unwrap();

    let key = |r: &retriever::Retrieval| -> Vec<(usize, String, u32)> {
        r.sources
            .iter()
            .map(|s| (s.source_index, s.file.clone(), s.start_line))
            .collect()
    };
    assert_eq!(key(&a), key(&b));
}

#[tokio::test]
async fn failed_hydration_keeps_slot_with_placeholder() {
    let repo = RepoId::new("acme", "shop");
    let index = Arc::new(MemoryIndexStore::new());
    index.upsert_repository(&repo, "main").await.unwrap();
    let mut payload = GenerationPayload::default();
    payload.upsert_symbol(symbol(
        "app/Ghost.php",
        "Ghost",
        "App\\Ghost",
        1,
        20,
    ));
    index
        .replace_all_for_repo(&repo, COMMIT, payload)
        .await
        .unwrap();

    // Provider has no content for app/Ghost.php.
    let provider = Arc::new(InMemoryProvider::new());
    provider.put_file(&repo, COMMIT, "other.php", "x\n").await;
    let snippets = Arc::new(SnippetFetcher::new(
        provider,
        Duration::from_secs(3600),
        500,
    ));
    let ghost_retriever = Retriever::new(
        index,
        Arc::new(MemoryVectorStore::new(4)),
        snippets,
        Arc::new(TopicEmbedder),
        RetrieverConfig::default(),
    );

    let out = ghost_retriever
        .retrieve(&repo, COMMIT, "ghost class", &CancelToken::never())
        .await
        .unwrap();
    assert_eq!(out.sources.len(), 1);
    assert!(out.sources[0].content.starts_with("[Could not fetch:"));
}

#[tokio::test]
async fn cancelled_request_aborts_fanout() {
    let (retriever, repo, _provider) = fixture().await;

    let source = CancelSource::new();
    let token = source.token();
    source.cancel();

    let err = retriever
        .retrieve(&repo, COMMIT, "anything", &token)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieveError::Cancelled(_)));
}

#[tokio::test]
async fn final_k_bounds_the_source_list() {
    let repo = RepoId::new("acme", "big");
    let index = Arc::new(MemoryIndexStore::new());
    index.upsert_repository(&repo, "main").await.unwrap();

    let mut payload = GenerationPayload::default();
    let provider = Arc::new(InMemoryProvider::new());
    for i in 0..30u32 {
        let file = format!("app/Jobs/QueueWorker{i:02}.php");
        payload.upsert_symbol(symbol(
            &file,
            "QueueWorker",
            &format!("App\\Jobs\\QueueWorker{i:02}"),
            1,
            20,
        ));
        provider.put_file(&repo, COMMIT, &file, "queue job\n").await;
    }
    index
        .replace_all_for_repo(&repo, COMMIT, payload)
        .await
        .unwrap();

    let snippets = Arc::new(SnippetFetcher::new(
        provider,
        Duration::from_secs(3600),
        500,
    ));
    let retriever = Retriever::new(
        index,
        Arc::new(MemoryVectorStore::new(4)),
        snippets,
        Arc::new(TopicEmbedder),
        RetrieverConfig {
            trigram_k: 25,
            final_k: 15,
            ..Default::default()
        },
    );

    let out = retriever
        .retrieve(&repo, COMMIT, "queueworker", &CancelToken::never())
        .await
        .unwrap();
    assert!(out.sources.len() <= 15);

    // Equal scores: files order lexicographically.
    let files: Vec<&str> = out.sources.iter().map(|s| s.file.as_str()).collect();
    let mut sorted = files.clone();
    sorted.sort();
    assert_eq!(files, sorted);
}
