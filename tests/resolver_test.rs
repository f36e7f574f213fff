// ABOUTME: Integration tests for the batch ingredient resolver waterfall
// ABOUTME: Covers deduplication, tier short-circuits, batch caps, deadlines and generic preference
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{alias_match, food_per_100g, resolver, MockFoodSource};
use nutrition_compiler::resolver::{IngredientResolver, ResolverSettings};
use nutrition_core::errors::PipelineError;
use nutrition_core::models::MatchSource;
use nutrition_sources::{FoodAliasCache, FoodDataSource};

fn remote(source: &Arc<MockFoodSource>) -> Arc<dyn FoodDataSource> {
    Arc::clone(source) as Arc<dyn FoodDataSource>
}

#[tokio::test]
async fn test_batch_deduplicates_names() {
    common::init_test_logging();
    let usda = Arc::new(
        MockFoodSource::new(MatchSource::Usda)
            .with_food(food_per_100g("1", "chicken", 165.0, 31.0, 0.0, 3.6))
            .with_food(food_per_100g("2", "rice", 130.0, 2.7, 28.0, 0.3)),
    );
    let resolver = resolver(FoodAliasCache::new(), None, vec![remote(&usda)]);

    let resolution = resolver
        .resolve_batch(&["Chicken", "  chicken ", "RICE", "rice"])
        .await;

    assert_eq!(resolution.len(), 2);
    assert_eq!(resolution.resolved_count(), 2);
    assert_eq!(usda.search_calls(), 2);
    assert_eq!(resolution.best("chicken").unwrap().id, "1");
    assert!((resolution.best("Rice").unwrap().per_100g.calories - 130.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_alias_hit_skips_every_source() {
    common::init_test_logging();
    let usda = Arc::new(MockFoodSource::new(MatchSource::Usda));
    let aliases = FoodAliasCache::from_entries([("brown rice", alias_match("42", "Rice, brown, cooked", 123.0))]);
    let resolver = resolver(aliases, None, vec![remote(&usda)]);

    let resolution = resolver.resolve_batch(&["Brown Rice"]).await;

    let best = resolution.best("brown rice").unwrap();
    assert_eq!(best.source, MatchSource::Alias);
    assert_eq!(best.id, "42");
    assert_eq!(usda.total_calls(), 0);
}

#[tokio::test]
async fn test_local_database_excludes_remote_tiers() {
    common::init_test_logging();
    let local = Arc::new(
        MockFoodSource::new(MatchSource::Local)
            .with_food(food_per_100g("7", "oats", 389.0, 17.0, 66.0, 7.0)),
    );
    let usda = Arc::new(
        MockFoodSource::new(MatchSource::Usda)
            .with_food(food_per_100g("8", "saffron", 310.0, 11.0, 65.0, 6.0)),
    );
    let resolver = resolver(FoodAliasCache::new(), Some(remote(&local)), vec![remote(&usda)]);

    let resolution = resolver.resolve_batch(&["oats", "saffron"]).await;

    assert!(resolver.has_local());
    assert_eq!(resolution.best("oats").unwrap().id, "7");
    assert!(resolution.candidates("saffron").is_empty());
    assert_eq!(usda.total_calls(), 0);
    assert_eq!(local.search_calls(), 2);
}

#[tokio::test]
async fn test_batch_over_cap_drops_extra_names() {
    common::init_test_logging();
    let usda = Arc::new(MockFoodSource::new(MatchSource::Usda));
    let resolver = resolver(FoodAliasCache::new(), None, vec![remote(&usda)]);
    let names: Vec<String> = (0..55).map(|i| format!("ingredient {i}")).collect();

    let resolution = resolver.resolve_batch(&names).await;

    assert_eq!(resolution.len(), 50);
    assert_eq!(resolution.dropped.len(), 5);
    assert_eq!(resolution.dropped[0], "ingredient 50");
    assert_eq!(usda.search_calls(), 50);
}

#[tokio::test]
async fn test_candidate_target_limits_detail_lookups() {
    common::init_test_logging();
    let mut source = MockFoodSource::new(MatchSource::Usda);
    for i in 0..5 {
        source = source.with_food(food_per_100g(&i.to_string(), &format!("rice {i}"), 130.0, 2.7, 28.0, 0.3));
    }
    let usda = Arc::new(source);
    let resolver = resolver(FoodAliasCache::new(), None, vec![remote(&usda)]);

    let candidates = resolver.resolve("rice").await;

    assert_eq!(candidates.len(), 3);
    assert_eq!(usda.detail_calls(), 3);
}

#[tokio::test]
async fn test_generic_foods_rank_ahead_of_branded() {
    common::init_test_logging();
    let usda = Arc::new(
        MockFoodSource::new(MatchSource::Usda)
            .with_branded_food(food_per_100g("b1", "greek yogurt", 97.0, 9.0, 4.0, 5.0), "Acme")
            .with_food(food_per_100g("g1", "greek yogurt plain", 59.0, 10.0, 3.6, 0.4)),
    );
    let resolver = resolver(FoodAliasCache::new(), None, vec![remote(&usda)]);

    let resolution = resolver.resolve_batch(&["greek yogurt"]).await;

    let ids: Vec<_> = resolution
        .candidates("greek yogurt")
        .iter()
        .map(|found| found.id.as_str())
        .collect();
    assert_eq!(ids, ["g1", "b1"]);
}

#[tokio::test]
async fn test_failing_source_falls_through_to_next() {
    common::init_test_logging();
    let broken = Arc::new(MockFoodSource::new(MatchSource::Usda).failing());
    let fatsecret = Arc::new(
        MockFoodSource::new(MatchSource::FatSecret)
            .with_food(food_per_100g("fs-1", "tempeh", 192.0, 20.0, 7.6, 11.0)),
    );
    let resolver = resolver(
        FoodAliasCache::new(),
        None,
        vec![remote(&broken), remote(&fatsecret)],
    );

    let resolution = resolver.resolve_batch(&["tempeh"]).await;

    assert_eq!(broken.search_calls(), 1);
    assert_eq!(resolution.best("tempeh").unwrap().id, "fs-1");
    assert!(resolution.timeout().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_keeps_partial_results() {
    common::init_test_logging();
    let usda = Arc::new(
        MockFoodSource::new(MatchSource::Usda)
            .with_food(food_per_100g("a", "alpha", 100.0, 5.0, 10.0, 2.0))
            .with_food(food_per_100g("b", "beta", 100.0, 5.0, 10.0, 2.0))
            .with_delay(Duration::from_millis(100)),
    );
    let settings = ResolverSettings {
        concurrency: 1,
        deadline: Duration::from_millis(150),
        ..ResolverSettings::default()
    };
    let resolver = IngredientResolver::new(
        Arc::new(FoodAliasCache::new()),
        None,
        vec![remote(&usda)],
        settings,
    );

    let resolution = resolver.resolve_batch(&["alpha", "beta"]).await;

    assert_eq!(resolution.best("alpha").unwrap().id, "a");
    assert!(resolution.candidates("beta").is_empty());
    assert_eq!(resolution.timed_out, ["beta"]);
    assert!(matches!(
        resolution.timeout(),
        Some(PipelineError::ResolutionTimeout { unresolved }) if unresolved == ["beta"]
    ));
}

#[tokio::test]
async fn test_find_food_turns_alias_into_record() {
    common::init_test_logging();
    let aliases = FoodAliasCache::from_entries([("banana", alias_match("9", "Bananas, raw", 89.0))]);
    let resolver = resolver(aliases, None, Vec::new());

    let record = resolver.find_food("Banana").await.unwrap();

    assert_eq!(record.source, MatchSource::Alias);
    assert_eq!(record.servings.len(), 1);
    assert_eq!(record.servings[0].gram_weight(), Some(100.0));
    assert!(resolver.find_food("durian").await.is_none());
}

#[tokio::test]
async fn test_search_lists_alias_then_source_hits() {
    common::init_test_logging();
    let aliases = FoodAliasCache::from_entries([("oats", alias_match("1", "Oats", 389.0))]);
    let usda = Arc::new(
        MockFoodSource::new(MatchSource::Usda)
            .with_food(food_per_100g("2", "rolled oats", 379.0, 13.0, 68.0, 6.5)),
    );
    let resolver = resolver(aliases, None, vec![remote(&usda)]);

    let hits = resolver.search("oats").await;

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].source, MatchSource::Alias);
    assert_eq!(hits[1].id, "2");
    assert_eq!(usda.detail_calls(), 0);
}
