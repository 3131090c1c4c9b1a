//! End-to-end indexing runs over fixture repositories.

use std::sync::Arc;

use async_trait::async_trait;
use index_pipeline::{IndexPipeline, PipelineConfig, PipelineError};
use index_store::{IndexStore, MemoryIndexStore, RepoId, RepoStatus, RouteFilter};
use llm_service::{Embedding, EmbeddingModel, LlmError};
use services::{CancelSource, CancelToken, MeterEvent, RecordingMeter};
use source_access::{InMemoryProvider, SourceProvider};
use vector_store::{MemoryVectorStore, VectorError, VectorRecord, VectorStore};

const COMMIT: &str = "cccccccccccccccccccccccccccccccccccccccc";

/// Deterministic embedder: a tiny hash of the text spread over 4 axes.
struct HashEmbedder;

#[async_trait]
impl EmbeddingModel for HashEmbedder {
    fn dimension(&self) -> usize {
        4
    }

    async fn embed(&self, text: &str) -> Result<Embedding, LlmError> {
        let mut vector = vec![0.0f32; 4];
        for (i, b) in text.bytes().enumerate() {
            vector[i % 4] += (b % 17) as f32 / 16.0;
        }
        Ok(Embedding {
            vector,
            token_count: (text.len() / 4) as u64,
        })
    }
}

const USER_MODEL: &str = r#"<?php

namespace App\Models;

class User
{
    public function orders()
    {
        return $this->hasMany(Order::class);
    }

    public function isActive(): bool
    {
        return $this->active;
    }

    public function deactivate(): void
    {
        $this->active = false;
        $this->save();
    }
}
"#;

const ROUTES: &str = r#"<?php

use App\Http\Controllers\OrderController;
use Illuminate\Support\Facades\Route;

Route::middleware(['auth'])->prefix('api')->group(function () {
    Route::get('/orders', [OrderController::class, 'index']);
});
"#;

const MIGRATION: &str = r#"<?php

use Illuminate\Support\Facades\Schema;

return new class extends Migration
{
    public function up(): void
    {
        Schema::create('orders', function (Blueprint $table) {
            $table->id();
        });
    }
};
"#;

async fn fixture_provider(repo: &RepoId) -> Arc<InMemoryProvider> {
    let provider = Arc::new(InMemoryProvider::new());
    provider
        .put_file(repo, COMMIT, "app/Models/User.php", USER_MODEL)
        .await;
    provider.put_file(repo, COMMIT, "routes/api.php", ROUTES).await;
    provider
        .put_file(
            repo,
            COMMIT,
            "database/migrations/2024_01_01_000000_create_orders_table.php",
            MIGRATION,
        )
        .await;
    provider
        .put_file(repo, COMMIT, "vendor/autoload.php", "<?php // generated\n")
        .await;
    provider
        .put_file(repo, COMMIT, "resources/views/welcome.blade.php", "<?php echo 1; ?>")
        .await;
    provider
}

fn pipeline(
    provider: Arc<InMemoryProvider>,
    index: Arc<MemoryIndexStore>,
    vectors: Arc<MemoryVectorStore>,
) -> IndexPipeline {
    IndexPipeline::new(
        provider,
        index,
        vectors,
        Arc::new(HashEmbedder),
        PipelineConfig::default(),
    )
}

#[tokio::test]
async fn full_run_builds_a_ready_generation() {
    let repo = RepoId::new("acme", "shop");
    let provider = fixture_provider(&repo).await;
    let index = Arc::new(MemoryIndexStore::new());
    let vectors = Arc::new(MemoryVectorStore::new(4));
    let meter = Arc::new(RecordingMeter::new());

    let outcome = pipeline(provider, index.clone(), vectors.clone())
        .with_meter(meter.clone())
        .run(&repo, "main", COMMIT, &CancelToken::never())
        .await
        .unwrap();

    assert!(!outcome.already_indexed);
    assert!(outcome.symbols >= 4); // User + 3 methods
    assert_eq!(outcome.routes, 1);
    assert_eq!(outcome.migrations, 1);
    assert!(outcome.parse_issues.is_empty());

    let row = index.repository(&repo).await.unwrap().unwrap();
    assert_eq!(row.status, RepoStatus::Ready);
    assert_eq!(row.last_indexed_commit.as_deref(), Some(COMMIT));

    // Vendored files never enter the generation.
    let generation = index.generation(&repo).await.unwrap();
    assert!(generation.files.iter().all(|f| !f.path.starts_with("vendor/")));
    // Non-PHP-parseable assets still get file rows.
    assert!(
        generation
            .files
            .iter()
            .any(|f| f.path == "resources/views/welcome.blade.php")
    );

    let routes = index.list_routes(&repo, &RouteFilter::default()).await.unwrap();
    assert_eq!(routes[0].full_uri, "/api/orders");
    assert_eq!(routes[0].middleware, vec!["auth".to_string()]);

    // The User class spans enough lines to be embedded and searchable.
    let hits = vectors.search(&repo, &[0.5, 0.5, 0.5, 0.5], 10).await.unwrap();
    assert!(!hits.is_empty());

    let records = meter.drain().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event, MeterEvent::Indexed);
    assert!(records[0].embedding_tokens > 0);
}

#[tokio::test]
async fn rerunning_the_same_commit_short_circuits() {
    let repo = RepoId::new("acme", "shop");
    let provider = fixture_provider(&repo).await;
    let index = Arc::new(MemoryIndexStore::new());
    let vectors = Arc::new(MemoryVectorStore::new(4));
    let pipe = pipeline(provider.clone(), index.clone(), vectors);

    pipe.run(&repo, "main", COMMIT, &CancelToken::never())
        .await
        .unwrap();
    let fetches_after_first = provider.fetch_count().await;

    let second = pipe
        .run(&repo, "main", COMMIT, &CancelToken::never())
        .await
        .unwrap();
    assert!(second.already_indexed);
    assert_eq!(provider.fetch_count().await, fetches_after_first);
}

#[tokio::test]
async fn two_fresh_runs_produce_identical_generations() {
    let repo = RepoId::new("acme", "shop");
    let provider = fixture_provider(&repo).await;

    let mut fingerprints = Vec::new();
    for _ in 0..2 {
        let index = Arc::new(MemoryIndexStore::new());
        let vectors = Arc::new(MemoryVectorStore::new(4));
        pipeline(provider.clone(), index.clone(), vectors)
            .run(&repo, "main", COMMIT, &CancelToken::never())
            .await
            .unwrap();
        let generation = index.generation(&repo).await.unwrap();
        fingerprints.push(generation.fingerprint().unwrap());
    }
    assert_eq!(fingerprints[0], fingerprints[1]);
}

/// Vector store that refuses the finalize batch.
struct FailingVectors;

#[async_trait]
impl VectorStore for FailingVectors {
    async fn upsert_vectors(&self, _repo: &RepoId, _batch: Vec<VectorRecord>) -> Result<(), VectorError> {
        Err(VectorError::DimensionMismatch { expected: 4, got: 0 })
    }

    async fn replace_repo(
        &self,
        _repo: &RepoId,
        _batch: Vec<VectorRecord>,
    ) -> Result<Vec<VectorRecord>, VectorError> {
        Err(VectorError::DimensionMismatch { expected: 4, got: 0 })
    }

    async fn search(
        &self,
        _repo: &RepoId,
        _query: &[f32],
        _k: usize,
    ) -> Result<Vec<vector_store::VectorHit>, VectorError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn finalize_failure_preserves_previous_generation() {
    let repo = RepoId::new("acme", "shop");
    let provider = fixture_provider(&repo).await;
    let index = Arc::new(MemoryIndexStore::new());

    // First run succeeds and becomes the visible generation.
    pipeline(provider.clone(), index.clone(), Arc::new(MemoryVectorStore::new(4)))
        .run(&repo, "main", COMMIT, &CancelToken::never())
        .await
        .unwrap();
    let visible_before = index.generation(&repo).await.unwrap();

    // Second run at a new commit hits a failing vector backend.
    let next_commit = "dddddddddddddddddddddddddddddddddddddddd";
    provider
        .put_file(&repo, next_commit, "app/Models/User.php", USER_MODEL)
        .await;
    let failing = IndexPipeline::new(
        provider,
        index.clone(),
        Arc::new(FailingVectors),
        Arc::new(HashEmbedder),
        PipelineConfig::default(),
    );
    let err = failing
        .run(&repo, "main", next_commit, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Vector(_)));

    let row = index.repository(&repo).await.unwrap().unwrap();
    assert_eq!(row.status, RepoStatus::Failed);
    assert!(row.error.is_some());
    // The old commit's generation is still what readers see.
    assert_eq!(row.last_indexed_commit.as_deref(), Some(COMMIT));
    let visible_after = index.generation(&repo).await.unwrap();
    assert_eq!(
        visible_before.fingerprint().unwrap(),
        visible_after.fingerprint().unwrap()
    );
}

/// Delegates to a real store but refuses every generation swap, the way
/// a backend with a failed transaction would.
struct RefusingIndex {
    inner: Arc<MemoryIndexStore>,
}

#[async_trait]
impl IndexStore for RefusingIndex {
    async fn upsert_repository(
        &self,
        repo: &RepoId,
        default_branch: &str,
    ) -> Result<index_store::Repository, index_store::IndexError> {
        self.inner.upsert_repository(repo, default_branch).await
    }

    async fn repository(
        &self,
        repo: &RepoId,
    ) -> Result<Option<index_store::Repository>, index_store::IndexError> {
        self.inner.repository(repo).await
    }

    async fn set_status(
        &self,
        repo: &RepoId,
        status: RepoStatus,
        error: Option<String>,
    ) -> Result<(), index_store::IndexError> {
        self.inner.set_status(repo, status, error).await
    }

    async fn replace_all_for_repo(
        &self,
        repo: &RepoId,
        _commit: &str,
        _payload: index_store::GenerationPayload,
    ) -> Result<(), index_store::IndexError> {
        Err(index_store::IndexError::Integrity {
            repo: repo.clone(),
            reason: "swap transaction aborted".to_string(),
        })
    }

    async fn trigram_search(
        &self,
        repo: &RepoId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<index_store::SymbolHit>, index_store::IndexError> {
        self.inner.trigram_search(repo, query, limit).await
    }

    async fn lookup_symbol_by_name(
        &self,
        repo: &RepoId,
        fq_name: &str,
    ) -> Result<Option<php_indexer::Symbol>, index_store::IndexError> {
        self.inner.lookup_symbol_by_name(repo, fq_name).await
    }

    async fn list_routes(
        &self,
        repo: &RepoId,
        filter: &RouteFilter,
    ) -> Result<Vec<php_indexer::Route>, index_store::IndexError> {
        self.inner.list_routes(repo, filter).await
    }

    async fn acquire_index_lease(
        &self,
        repo: &RepoId,
        commit: &str,
    ) -> Result<bool, index_store::IndexError> {
        self.inner.acquire_index_lease(repo, commit).await
    }

    async fn release_index_lease(
        &self,
        repo: &RepoId,
        commit: &str,
    ) -> Result<(), index_store::IndexError> {
        self.inner.release_index_lease(repo, commit).await
    }
}

#[tokio::test]
async fn metadata_swap_failure_rolls_vectors_back() {
    let repo = RepoId::new("acme", "shop");
    let provider = fixture_provider(&repo).await;
    let index = Arc::new(MemoryIndexStore::new());
    let vectors = Arc::new(MemoryVectorStore::new(4));

    // Establish the visible generation in both stores.
    pipeline(provider.clone(), index.clone(), vectors.clone())
        .run(&repo, "main", COMMIT, &CancelToken::never())
        .await
        .unwrap();
    let before = vectors.search(&repo, &[0.5, 0.5, 0.5, 0.5], 10).await.unwrap();
    assert!(before.iter().any(|h| h.key.file == "app/Models/User.php"));

    // A new commit with different content, against a store whose swap
    // transaction always aborts.
    let next_commit = "9999999999999999999999999999999999999999";
    provider
        .put_file(
            &repo,
            next_commit,
            "app/Models/Account.php",
            &USER_MODEL.replace("User", "Account"),
        )
        .await;

    let failing = IndexPipeline::new(
        provider,
        Arc::new(RefusingIndex { inner: index.clone() }),
        vectors.clone(),
        Arc::new(HashEmbedder),
        PipelineConfig::default(),
    );
    let err = failing
        .run(&repo, "main", next_commit, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Index(index_store::IndexError::Integrity { .. })
    ));

    // The displaced batch was reinstated: old keys serve, new ones do not.
    let after = vectors.search(&repo, &[0.5, 0.5, 0.5, 0.5], 10).await.unwrap();
    assert!(after.iter().any(|h| h.key.file == "app/Models/User.php"));
    assert!(after.iter().all(|h| h.key.file != "app/Models/Account.php"));

    // Metadata still points at the old commit.
    let row = index.repository(&repo).await.unwrap().unwrap();
    assert_eq!(row.status, RepoStatus::Failed);
    assert_eq!(row.last_indexed_commit.as_deref(), Some(COMMIT));
}

#[tokio::test]
async fn held_lease_rejects_concurrent_run() {
    let repo = RepoId::new("acme", "shop");
    let provider = fixture_provider(&repo).await;
    let index = Arc::new(MemoryIndexStore::new());
    index.upsert_repository(&repo, "main").await.unwrap();
    assert!(index.acquire_index_lease(&repo, "other").await.unwrap());

    let err = pipeline(provider, index, Arc::new(MemoryVectorStore::new(4)))
        .run(&repo, "main", COMMIT, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ConcurrentRun { .. }));
}

#[tokio::test]
async fn cancellation_marks_run_failed_and_keeps_nothing() {
    let repo = RepoId::new("acme", "shop");
    let provider = fixture_provider(&repo).await;
    let index = Arc::new(MemoryIndexStore::new());

    let source = CancelSource::new();
    let token = source.token();
    source.cancel();

    let err = pipeline(provider, index.clone(), Arc::new(MemoryVectorStore::new(4)))
        .run(&repo, "main", COMMIT, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled(_)));

    let row = index.repository(&repo).await.unwrap().unwrap();
    assert_eq!(row.status, RepoStatus::Failed);
    assert!(row.last_indexed_commit.is_none());
    assert!(index.generation(&repo).await.is_none());
}
