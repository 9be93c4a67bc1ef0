//! Repository behaviour through the unit of work against a real SQLite pool.

use school_api::config::DatabaseConfig;
use school_api::domain::{Organization, OrganizationId, OrganizationPatch};
use school_api::storage::{
    create_pool, EntityState, OrganizationRepository, SqlxOrganizationRepository,
};

async fn repository() -> SqlxOrganizationRepository {
    let pool = create_pool(&DatabaseConfig::in_memory()).await.expect("create sqlite pool");
    SqlxOrganizationRepository::new(pool)
}

#[tokio::test]
async fn saved_organization_can_be_read_back() {
    let mut repo = repository().await;

    let created = repo.create(
        Organization::unsaved("Acme").with_address("1 Main Street").with_country("USA"),
    );
    assert!(!created.id.is_unset());
    assert_eq!(repo.state(&created.id), Some(EntityState::Added));

    repo.save().await.unwrap();
    assert_eq!(repo.state(&created.id), Some(EntityState::Persisted));

    let stored = repo.get_by_id(&created.id, false).await.unwrap().unwrap();
    assert_eq!(stored, created);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let mut repo = repository().await;
    let created = repo.create(Organization::unsaved("Acme").with_city("Boston"));
    repo.save().await.unwrap();

    let mut tracked = repo.get_by_id(&created.id, true).await.unwrap().unwrap();
    repo.update(&mut tracked, OrganizationPatch::name("Acme Corp"));
    repo.save().await.unwrap();

    let stored = repo.get_by_id(&created.id, false).await.unwrap().unwrap();
    assert_eq!(stored.name, "Acme Corp");
    assert_eq!(stored.city.as_deref(), Some("Boston"));
}

#[tokio::test]
async fn failed_save_applies_nothing() {
    let mut repo = repository().await;

    let valid = repo.create(Organization::unsaved("Valid"));
    let invalid = repo.create(Organization::unsaved("x".repeat(61)));

    assert!(repo.save().await.is_err());
    assert_eq!(repo.state(&valid.id), Some(EntityState::Failed));
    assert_eq!(repo.state(&invalid.id), Some(EntityState::Failed));
    assert!(repo.get_by_id(&valid.id, false).await.unwrap().is_none());

    repo.discard();
    assert_eq!(repo.state(&valid.id), None);

    let retried = repo.create(Organization::unsaved("Valid"));
    repo.save().await.unwrap();
    assert!(repo.get_by_id(&retried.id, false).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_removes_row() {
    let mut repo = repository().await;
    let created = repo.create(Organization::unsaved("Acme"));
    repo.save().await.unwrap();

    repo.delete(created.clone());
    assert_eq!(repo.state(&created.id), Some(EntityState::Deleted));
    repo.save().await.unwrap();

    assert!(repo.get_by_id(&created.id, false).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_id_is_absent() {
    let mut repo = repository().await;
    assert!(repo.get_by_id(&OrganizationId::new(), false).await.unwrap().is_none());
    assert!(repo.get_all(false).await.unwrap().is_empty());
}
