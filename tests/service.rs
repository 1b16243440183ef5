mod common;

use common::{ids, seeded_service, NewUser, UserPatch, Users};
use resource_sdk::error::QueryExecutionError;
use resource_sdk::filter::{FilterNode, FilterRule, FilterRuleGroup, Operator};
use resource_sdk::sql::{Direction, StatementKind};
use resource_sdk::{AppError, CrudService, FindOptions, Id, MemoryClient, Table};
use serde_json::json;

fn contains(field: &str, value: &str) -> FilterNode {
    FilterRule::new(field, Operator::Contains, json!(value)).into()
}

#[tokio::test]
async fn or_of_contains_returns_matching_records_in_store_order() {
    let (service, _) = seeded_service();
    let options = FindOptions::default()
        .with_filter(FilterRuleGroup::or(vec![contains("name", "Jo"), contains("email", "Jo")]))
        .with_limit(5)
        .with_offset(0);
    let users = service.find_all(&options).await.unwrap();
    assert_eq!(ids(&users), vec![1, 2]);
}

#[tokio::test]
async fn update_of_missing_id_is_not_found_without_writes() {
    let (service, client) = seeded_service();
    let patch = UserPatch {
        name: Some("X".into()),
        ..Default::default()
    };
    let err = service.update(&Id::from("nonexistent-id"), &patch).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(client.write_count(), 0);
    assert_eq!(client.statements(), vec![StatementKind::Count]);
}

#[tokio::test]
async fn delete_of_missing_id_is_not_found_without_writes() {
    let (service, client) = seeded_service();
    let err = service.delete(&Id::Int(42)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(client.write_count(), 0);
}

#[tokio::test]
async fn update_checks_existence_before_writing() {
    let (service, client) = seeded_service();
    let patch = UserPatch {
        email: Some("bob@x.com".into()),
        ..Default::default()
    };
    let user = service.update(&Id::Int(3), &patch).await.unwrap();
    assert_eq!(user.email.as_deref(), Some("bob@x.com"));
    assert_eq!(user.name, "Bob");
    assert_eq!(client.statements(), vec![StatementKind::Count, StatementKind::Update]);
}

#[tokio::test]
async fn delete_removes_existing_record() {
    let (service, client) = seeded_service();
    service.delete(&Id::Int(2)).await.unwrap();
    assert_eq!(client.statements(), vec![StatementKind::Count, StatementKind::Delete]);
    assert!(matches!(service.find_by_id(&Id::Int(2)).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn find_by_id_maps_absence_to_not_found() {
    let (service, _) = seeded_service();
    assert_eq!(service.find_by_id(&Id::Int(1)).await.unwrap().name, "John");
    assert!(matches!(service.find_by_id(&Id::Int(9)).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn find_one_and_find_all_return_empty_without_error() {
    let (service, _) = seeded_service();
    let nobody = FilterRuleGroup::and(vec![FilterRule::new("name", Operator::Equals, json!("Zed")).into()]);
    assert_eq!(service.find_one(&nobody).await.unwrap(), None);
    assert!(service
        .find_all(&FindOptions::default().with_filter(nobody))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn default_limit_is_ten() {
    let client = MemoryClient::new();
    client.seed(
        &Users::table_ref(),
        (1..=15).map(|i| json!({"id": i, "name": format!("user{}", i)})),
    );
    let service: CrudService<Users, MemoryClient> = CrudService::new(client);
    let users = service.find_all(&FindOptions::default()).await.unwrap();
    assert_eq!(users.len(), 10);
    let (page, total) = service
        .find_and_count(&FindOptions::default().with_offset(10))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![11, 12, 13, 14, 15]);
    assert_eq!(total, 15);
}

#[tokio::test]
async fn unknown_order_by_fields_are_dropped() {
    let (service, _) = seeded_service();
    let options = FindOptions::default()
        .order_by("shoe_size", Direction::Desc)
        .order_by("name", Direction::Asc);
    let users = service.find_all(&options).await.unwrap();
    assert_eq!(ids(&users), vec![2, 3, 1]);
}

#[tokio::test]
async fn invalid_filter_fails_before_any_query() {
    let (service, client) = seeded_service();
    let bad = FilterRuleGroup::and(vec![FilterRule::new("name; --", Operator::Equals, json!("x")).into()]);
    let err = service.find_all(&FindOptions::default().with_filter(bad)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidFilter(_)));
    assert!(client.statements().is_empty());

    let range = FilterRuleGroup::and(vec![FilterRule::new("id", Operator::Between, json!([1])).into()]);
    assert!(matches!(
        service.count(Some(&range)).await,
        Err(AppError::InvalidFilter(_))
    ));
}

#[tokio::test]
async fn store_failures_surface_as_query_execution_errors() {
    let (service, client) = seeded_service();
    client.fail_next("connection reset by peer");
    match service.find_all(&FindOptions::default()).await {
        Err(AppError::QueryExecution(e)) => assert_eq!(e, QueryExecutionError::new("FindAll")),
        other => panic!("expected query execution error, got {:?}", other.map(|u| u.len())),
    }
}

#[tokio::test]
async fn create_returns_store_assigned_id() {
    let (service, client) = seeded_service();
    let user = service
        .create(&NewUser {
            name: "Dee".into(),
            email: None,
        })
        .await
        .unwrap();
    assert_eq!(user.id, 4);
    assert_eq!(client.write_count(), 1);
    assert_eq!(service.count(None).await.unwrap(), 4);
}

#[tokio::test]
async fn regrouped_filters_match_the_same_records() {
    let (service, _) = seeded_service();
    let a: FilterNode = FilterRule::new("id", Operator::GreaterEquals, json!(1)).into();
    let b: FilterNode = FilterRule::unary("email", Operator::IsNull).into();
    let c: FilterNode = FilterRule::new("name", Operator::StartsWith, json!("j")).into();

    let nested = FilterRuleGroup::and(vec![FilterRuleGroup::and(vec![a.clone(), b.clone()]).into(), c.clone()]);
    let flat = FilterRuleGroup::and(vec![a.clone(), b.clone(), c.clone()]);
    let left = service.find_all(&FindOptions::default().with_filter(nested)).await.unwrap();
    let right = service.find_all(&FindOptions::default().with_filter(flat)).await.unwrap();
    assert_eq!(ids(&left), vec![1]);
    assert_eq!(left, right);

    let nested_or = FilterRuleGroup::or(vec![FilterRuleGroup::or(vec![b.clone(), c.clone()]).into(), a.clone()]);
    let flat_or = FilterRuleGroup::or(vec![a, b, c]);
    let left = service.find_all(&FindOptions::default().with_filter(nested_or)).await.unwrap();
    let right = service.find_all(&FindOptions::default().with_filter(flat_or)).await.unwrap();
    assert_eq!(left, right);
}

#[tokio::test]
async fn negated_group_excludes_matches() {
    let (service, _) = seeded_service();
    let filter = FilterRuleGroup::or(vec![contains("name", "o")]).negated();
    let users = service.find_all(&FindOptions::default().with_filter(filter)).await.unwrap();
    assert_eq!(ids(&users), vec![2]);
}

#[tokio::test]
async fn check_exists_follows_count() {
    let (service, _) = seeded_service();
    let amy = FilterRuleGroup::and(vec![FilterRule::new("email", Operator::EndsWith, json!("@x.com")).into()]);
    assert!(service.check_exists(&amy).await.unwrap());
    assert_eq!(service.count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn negated_comparison_on_null_column_matches_nothing() {
    let (service, _) = seeded_service();
    let is_amy: FilterNode = FilterRule::new("email", Operator::Equals, json!("jo@x.com")).into();
    let not_amy = FilterRuleGroup::and(vec![is_amy.clone()]).negated();
    let users = service.find_all(&FindOptions::default().with_filter(not_amy.clone())).await.unwrap();
    assert!(users.is_empty());

    let or_missing = FilterRuleGroup::or(vec![not_amy.into(), FilterRule::unary("email", Operator::IsNull).into()]);
    let users = service.find_all(&FindOptions::default().with_filter(or_missing)).await.unwrap();
    assert_eq!(ids(&users), vec![1, 3]);
}
