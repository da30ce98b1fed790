//! End-to-end flow over the resolver, redirect path and cache, using the
//! in-memory store and the moka cache.

use std::time::Duration;
use taut_cache::MokaLinkCache;
use taut_core::config::LinkConfig;
use taut_core::link::Caller;
use taut_links::{CreateLink, HashCodeGenerator, LinkError, LinkService, Redirector, UpdateLink};
use taut_storage::InMemoryLinkStore;

type Service = LinkService<InMemoryLinkStore, MokaLinkCache, HashCodeGenerator>;

fn service() -> Service {
    let config = LinkConfig::builder().generation_secret("s3cret").build();
    LinkService::new(
        InMemoryLinkStore::new(),
        MokaLinkCache::default(),
        HashCodeGenerator::new(config.code_length),
        config,
    )
}

fn request(url: &str) -> CreateLink {
    CreateLink {
        long_url: url.to_string(),
        custom_alias: None,
        expires_at: None,
        owner: None,
    }
}

#[tokio::test]
async fn shorten_redirect_and_count() {
    let service = service();
    let redirector = Redirector::new(service.clone());

    let link = service.create(request("http://a.example/x")).await.unwrap();
    assert!((6..=10).contains(&link.short_code.len()));

    let resolved = service.resolve(&link.short_code).await.unwrap();
    assert_eq!(resolved.long_url, "http://a.example/x");

    assert_eq!(
        redirector.redirect(&link.short_code).await.unwrap(),
        "http://a.example/x"
    );
    assert_eq!(
        redirector.redirect(&link.short_code).await.unwrap(),
        "http://a.example/x"
    );

    // Counter bumps run after the redirect responses.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let counted = service.resolve(&link.short_code).await.unwrap();
    assert_eq!(counted.redirect_counter, 2);
}

#[tokio::test]
async fn alias_lifecycle_with_ownership() {
    let service = service();
    let owner = Caller {
        id: 1,
        is_superuser: false,
    };
    let stranger = Caller {
        id: 2,
        is_superuser: false,
    };

    let link = service
        .create(CreateLink {
            custom_alias: Some("abcd".to_string()),
            owner: Some(owner),
            ..request("https://example.com/doc")
        })
        .await
        .unwrap();
    assert_eq!(link.short_code, "abcd");

    // Second create with the same alias conflicts.
    let err = service
        .create(CreateLink {
            custom_alias: Some("abcd".to_string()),
            ..request("https://example.com/other")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::DuplicateAlias(_)));

    // A stranger can neither update nor delete; the link survives.
    let err = service
        .update(
            "abcd",
            &stranger,
            UpdateLink {
                long_url: None,
                expires_at: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::PermissionDenied));

    let err = service.delete("abcd", &stranger).await.unwrap_err();
    assert!(matches!(err, LinkError::PermissionDenied));
    assert!(service.resolve("abcd").await.is_ok());

    // The owner can.
    service.delete("abcd", &owner).await.unwrap();
    let err = service.resolve("abcd").await.unwrap_err();
    assert!(matches!(err, LinkError::NotFound));
}

#[tokio::test]
async fn deleted_links_stop_redirecting_after_invalidation() {
    let service = service();
    let redirector = Redirector::new(service.clone());
    let owner = Caller {
        id: 1,
        is_superuser: false,
    };

    let link = service
        .create(CreateLink {
            owner: Some(owner),
            ..request("https://example.com")
        })
        .await
        .unwrap();

    // Warm the redirect cache, then delete.
    redirector.redirect(&link.short_code).await.unwrap();
    service.delete(&link.short_code, &owner).await.unwrap();

    // Once the spawned invalidation has run, the cached destination is
    // gone and the redirect misses through to the store.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = redirector.redirect(&link.short_code).await.unwrap_err();
    assert!(matches!(err, LinkError::NotFound));
}

#[tokio::test]
async fn search_finds_links_after_scheme_normalization() {
    let service = service();
    service.create(request("a.example/x")).await.unwrap();

    // Stored normalized with http://; schemeless search still finds it.
    let found = service.find_by_url("a.example/x").await.unwrap();
    assert_eq!(found.long_url, "http://a.example/x");
}
