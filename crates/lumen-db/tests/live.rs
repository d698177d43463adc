//! Live integration tests for lumen-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/lumen-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use lumen_core::{NewReview, Role};
use lumen_db::{
    create_user, find_user_by_email, insert_review, list_reviews, review_ratings_for_slug,
    set_user_role, DbError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_review(product_id: &str, slug: &str, rating: i16) -> NewReview {
    NewReview {
        product_id: product_id.to_string(),
        product_slug: slug.to_string(),
        user_name: "Ayesha".to_string(),
        user_email: "ayesha@example.com".to_string(),
        rating,
        comment: "Bright and even light.".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Section 1: Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn create_and_find_user_by_email(pool: sqlx::PgPool) {
    let created = create_user(&pool, "Bilal", "bilal@example.com", "hash", Role::Customer)
        .await
        .expect("create_user failed");
    assert_eq!(created.role, "customer");

    let found = find_user_by_email(&pool, "bilal@example.com")
        .await
        .expect("find_user_by_email failed")
        .expect("user should exist");
    assert_eq!(found.id, created.id);
    assert_eq!(found.public_id, created.public_id);
    assert_eq!(found.password_hash, "hash");
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_unknown_email_returns_none(pool: sqlx::PgPool) {
    let found = find_user_by_email(&pool, "nobody@example.com")
        .await
        .expect("find_user_by_email failed");
    assert!(found.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_email_is_a_unique_violation(pool: sqlx::PgPool) {
    create_user(&pool, "First", "dup@example.com", "hash", Role::Customer)
        .await
        .expect("first insert");

    let err = create_user(&pool, "Second", "dup@example.com", "hash", Role::Customer)
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn unnormalized_email_is_rejected_by_constraint(pool: sqlx::PgPool) {
    let result = create_user(&pool, "Caps", "Caps@Example.com", "hash", Role::Customer).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../migrations")]
async fn set_user_role_promotes_to_admin(pool: sqlx::PgPool) {
    create_user(&pool, "Owner", "owner@example.com", "hash", Role::Customer)
        .await
        .expect("create_user failed");

    set_user_role(&pool, "owner@example.com", Role::Admin)
        .await
        .expect("set_user_role failed");

    let row = find_user_by_email(&pool, "owner@example.com")
        .await
        .expect("find failed")
        .expect("user should exist");
    assert_eq!(row.role().expect("known role"), Role::Admin);
    assert!(row.to_public().expect("public").is_admin());
}

#[sqlx::test(migrations = "../../migrations")]
async fn set_user_role_for_unknown_email_is_not_found(pool: sqlx::PgPool) {
    let err = set_user_role(&pool, "ghost@example.com", Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 2: Reviews
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_review_returns_stored_row(pool: sqlx::PgPool) {
    let row = insert_review(&pool, &make_review("1", "smd-metallic-light", 5))
        .await
        .expect("insert_review failed");

    assert_eq!(row.product_id, "1");
    assert_eq!(row.product_slug, "smd-metallic-light");
    assert_eq!(row.rating, 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rating_outside_range_is_rejected_by_constraint(pool: sqlx::PgPool) {
    let result = insert_review(&pool, &make_review("1", "smd-metallic-light", 6)).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_reviews_filters_by_id_or_slug(pool: sqlx::PgPool) {
    insert_review(&pool, &make_review("1", "smd-metallic-light", 5))
        .await
        .expect("insert 1");
    insert_review(&pool, &make_review("1", "smd-metallic-light", 3))
        .await
        .expect("insert 2");
    insert_review(&pool, &make_review("3", "led-bulb", 4))
        .await
        .expect("insert 3");

    let by_id = list_reviews(&pool, Some("1"), None).await.expect("by id");
    assert_eq!(by_id.len(), 2);
    // Newest first.
    assert_eq!(by_id[0].rating, 3);

    let by_slug = list_reviews(&pool, None, Some("led-bulb"))
        .await
        .expect("by slug");
    assert_eq!(by_slug.len(), 1);

    let both = list_reviews(&pool, Some("3"), Some("smd-metallic-light"))
        .await
        .expect("both");
    assert!(both.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn ratings_for_slug_only_include_that_product(pool: sqlx::PgPool) {
    insert_review(&pool, &make_review("4", "cob-light", 4))
        .await
        .expect("insert");
    insert_review(&pool, &make_review("4", "cob-light", 2))
        .await
        .expect("insert");
    insert_review(&pool, &make_review("5", "adjustable-moon-light", 5))
        .await
        .expect("insert");

    let mut ratings = review_ratings_for_slug(&pool, "cob-light")
        .await
        .expect("ratings");
    ratings.sort_unstable();
    assert_eq!(ratings, vec![2, 4]);
}
