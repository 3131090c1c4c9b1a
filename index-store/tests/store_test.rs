//! Contract tests for the in-memory index store.

use index_store::{
    GenerationPayload, IndexStore, MemoryIndexStore, RepoId, RepoStatus, RouteFilter,
};
use php_indexer::{HandlerType, HttpMethod, Route, Symbol, SymbolKind};

fn symbol(file: &str, name: &str, qualified: &str, start: u32) -> Symbol {
    Symbol {
        file: file.to_string(),
        name: name.to_string(),
        qualified_name: qualified.to_string(),
        kind: SymbolKind::Class,
        start_line: start,
        end_line: start + 20,
        signature: None,
        docstring: None,
        parent_symbol: None,
        visibility: None,
        is_static: false,
    }
}

fn route(uri: &str, method: HttpMethod, name: Option<&str>) -> Route {
    Route {
        source_file: "routes/api.php".to_string(),
        method,
        uri: uri.to_string(),
        full_uri: uri.to_string(),
        name: name.map(str::to_string),
        handler_type: HandlerType::Controller,
        controller: Some("ApiController".to_string()),
        action: Some("handle".to_string()),
        middleware: vec!["api".to_string()],
        start_line: 10,
    }
}

fn auth_payload() -> GenerationPayload {
    let mut payload = GenerationPayload::default();
    payload.upsert_symbol(symbol(
        "app/Http/Middleware/Authenticate.php",
        "Authenticate",
        "App\\Http\\Middleware\\Authenticate",
        1,
    ));
    payload.upsert_symbol(symbol(
        "app/Services/AuthManager.php",
        "AuthManager",
        "App\\Services\\AuthManager",
        5,
    ));
    payload.upsert_symbol(symbol(
        "app/Models/Invoice.php",
        "Invoice",
        "App\\Models\\Invoice",
        3,
    ));
    payload.upsert_route(route("/api/users", HttpMethod::Get, Some("users.index")));
    payload.upsert_route(route("/api/users", HttpMethod::Post, Some("users.store")));
    payload.upsert_route(route("/health", HttpMethod::Get, None));
    payload
}

#[tokio::test]
async fn trigram_search_ranks_by_name_similarity() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();
    store
        .replace_all_for_repo(&repo, &"a".repeat(40), auth_payload())
        .await
        .unwrap();

    let hits = store.trigram_search(&repo, "authenticate", 10).await.unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].symbol.name, "Authenticate");
    assert!(hits[0].score > 0.9);

    // Related-but-different names rank below the exact one.
    if let Some(manager) = hits.iter().find(|h| h.symbol.name == "AuthManager") {
        assert!(manager.score < hits[0].score);
    }
    // Unrelated symbols stay out entirely.
    assert!(hits.iter().all(|h| h.symbol.name != "Invoice"));
}

#[tokio::test]
async fn trigram_search_ties_break_on_file_then_line() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();

    let mut payload = GenerationPayload::default();
    payload.upsert_symbol(symbol("b.php", "PaymentService", "B\\PaymentService", 10));
    payload.upsert_symbol(symbol("a.php", "PaymentService", "A\\PaymentService", 30));
    payload.upsert_symbol(symbol("a.php", "PaymentService", "A\\PaymentService", 5));
    store
        .replace_all_for_repo(&repo, &"b".repeat(40), payload)
        .await
        .unwrap();

    let hits = store.trigram_search(&repo, "PaymentService", 10).await.unwrap();
    let order: Vec<(String, u32)> = hits
        .iter()
        .map(|h| (h.symbol.file.clone(), h.symbol.start_line))
        .collect();
    // name scores are equal; qualified names differ only by prefix, and the
    // two a.php entries are fully identical except for line.
    assert_eq!(order[0].0, "a.php");
    assert!(order[0].1 < order[1].1 || order[1].0 == "b.php");
}

#[tokio::test]
async fn substring_of_search_text_surfaces() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();
    store
        .replace_all_for_repo(&repo, &"c".repeat(40), auth_payload())
        .await
        .unwrap();

    // "Middleware" appears only inside the qualified name.
    let hits = store.trigram_search(&repo, "middleware", 10).await.unwrap();
    assert!(
        hits.iter()
            .any(|h| h.symbol.qualified_name.contains("Middleware"))
    );
}

#[tokio::test]
async fn lookup_and_route_filters() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();
    store
        .replace_all_for_repo(&repo, &"d".repeat(40), auth_payload())
        .await
        .unwrap();

    let found = store
        .lookup_symbol_by_name(&repo, "App\\Services\\AuthManager")
        .await
        .unwrap();
    assert_eq!(found.unwrap().name, "AuthManager");
    assert!(
        store
            .lookup_symbol_by_name(&repo, "App\\Missing")
            .await
            .unwrap()
            .is_none()
    );

    let all = store.list_routes(&repo, &RouteFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let posts = store
        .list_routes(
            &repo,
            &RouteFilter {
                method: Some(HttpMethod::Post),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].name.as_deref(), Some("users.store"));

    let named = store
        .list_routes(
            &repo,
            &RouteFilter {
                name_contains: Some("users.".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(named.len(), 2);
}

#[tokio::test]
async fn generation_swap_is_all_or_nothing_for_readers() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();
    store
        .replace_all_for_repo(&repo, &"e".repeat(40), auth_payload())
        .await
        .unwrap();

    // A reader holding the old generation keeps a complete snapshot
    // while the swap happens underneath.
    let before = store.generation(&repo).await.unwrap();
    assert_eq!(before.symbols.len(), 3);

    let mut replacement = GenerationPayload::default();
    replacement.upsert_symbol(symbol("new.php", "Fresh", "App\\Fresh", 1));
    store
        .replace_all_for_repo(&repo, &"f".repeat(40), replacement)
        .await
        .unwrap();

    assert_eq!(before.symbols.len(), 3);
    assert_eq!(before.routes.len(), 3);

    let after = store.generation(&repo).await.unwrap();
    assert_eq!(after.symbols.len(), 1);
    assert!(after.routes.is_empty());

    let repo_row = store.repository(&repo).await.unwrap().unwrap();
    assert_eq!(repo_row.status, RepoStatus::Ready);
    assert_eq!(repo_row.last_indexed_commit.as_deref(), Some(&*"f".repeat(40)));
}

#[tokio::test]
async fn ready_repo_always_has_commit() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    let row = store.upsert_repository(&repo, "main").await.unwrap();
    assert_eq!(row.status, RepoStatus::Pending);
    assert!(row.last_indexed_commit.is_none());

    store
        .replace_all_for_repo(&repo, &"9".repeat(40), GenerationPayload::default())
        .await
        .unwrap();
    let row = store.repository(&repo).await.unwrap().unwrap();
    assert_eq!(row.status, RepoStatus::Ready);
    assert!(row.last_indexed_commit.is_some());
}

#[tokio::test]
async fn corrupt_payload_is_refused_wholesale() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();
    store
        .replace_all_for_repo(&repo, &"1".repeat(40), auth_payload())
        .await
        .unwrap();

    // Inverted line span violates the symbol invariant.
    let mut bad = auth_payload();
    let mut inverted = symbol("x.php", "Broken", "App\\Broken", 50);
    inverted.end_line = 10;
    bad.upsert_symbol(inverted);

    let err = store
        .replace_all_for_repo(&repo, &"2".repeat(40), bad)
        .await
        .unwrap_err();
    assert!(matches!(err, index_store::IndexError::Integrity { .. }));
    assert!(err.to_string().contains("App\\Broken"));

    // The previous generation is untouched, commit included.
    let row = store.repository(&repo).await.unwrap().unwrap();
    assert_eq!(row.status, RepoStatus::Ready);
    assert_eq!(row.last_indexed_commit.as_deref(), Some(&*"1".repeat(40)));
    assert_eq!(store.generation(&repo).await.unwrap().symbols.len(), 3);
}

#[tokio::test]
async fn non_hex_commit_is_an_integrity_error() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();

    let err = store
        .replace_all_for_repo(&repo, "HEAD", auth_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, index_store::IndexError::Integrity { .. }));
    assert!(store.generation(&repo).await.is_none());
}

#[tokio::test]
async fn lease_serializes_indexing_runs() {
    let store = MemoryIndexStore::new();
    let repo = RepoId::new("acme", "shop");
    store.upsert_repository(&repo, "main").await.unwrap();

    assert!(store.acquire_index_lease(&repo, "abc").await.unwrap());
    assert!(!store.acquire_index_lease(&repo, "abc").await.unwrap());
    assert!(!store.acquire_index_lease(&repo, "def").await.unwrap());

    store.release_index_lease(&repo, "abc").await.unwrap();
    assert!(store.acquire_index_lease(&repo, "def").await.unwrap());
}

#[tokio::test]
async fn identical_payloads_fingerprint_equal() {
    let a = auth_payload().fingerprint().unwrap();
    let b = auth_payload().fingerprint().unwrap();
    assert_eq!(a, b);

    let mut other = auth_payload();
    other.upsert_symbol(symbol("x.php", "X", "X", 1));
    assert_ne!(a, other.fingerprint().unwrap());
}
