// ABOUTME: Composition root wiring sources, caches, breakers and the compiler into one pipeline
// ABOUTME: Runs correction, compilation and the compliance audit for a drafted plan
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Pipeline orchestration
//!
//! Nothing here is a global: every cache, breaker and client is built by
//! [`NutritionPipeline::from_config`] or injected through [`PipelineBuilder`].

use std::sync::Arc;

use nutrition_core::errors::AppResult;
use nutrition_core::models::{CompiledPlan, DietaryPreferences, DietaryStyle, FoodSearchHit, MealPlanDraft};
use nutrition_intelligence::{ComplianceReport, ComplianceScanner, CorrectionReport, MacroCorrector};
use nutrition_sources::{
    build_client, FatSecretSource, FoodAliasCache, FoodDataSource, LocalFoodSearch, RecipeSource,
    SourceHealth, UsdaFoodSource,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::compiler::{NutritionCompiler, ProgressSender};
use crate::config::PipelineConfig;
use crate::fallback_plan::FallbackPlanGenerator;
use crate::resolver::{IngredientResolver, ResolverSettings};

/// Everything one pipeline run produces
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    /// Schema-validated compiled plan
    pub plan: CompiledPlan,
    /// Draft corrections applied before compiling
    pub corrections: CorrectionReport,
    /// Allergen and diet audit of the compiled plan
    pub compliance: ComplianceReport,
}

/// Verification and compilation pipeline
pub struct NutritionPipeline {
    config: PipelineConfig,
    resolver: Arc<IngredientResolver>,
    compiler: NutritionCompiler,
    corrector: MacroCorrector,
}

impl NutritionPipeline {
    /// Build every configured source from configuration
    ///
    /// The local database is opened and migrated when configured, and its
    /// aliases are loaded. Remote sources are enabled by their credentials;
    /// `FatSecret` also serves recipes.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the HTTP client cannot be
    /// built, or the local database cannot be opened.
    pub async fn from_config(config: PipelineConfig) -> AppResult<Self> {
        config.validate()?;
        let mut builder = PipelineBuilder::new().with_config(config.clone());

        if let Some(url) = &config.sources.local_database_url {
            let local = LocalFoodSearch::connect(url).await?;
            let aliases = FoodAliasCache::new();
            aliases.load_from_pool(local.pool()).await?;
            builder = builder
                .with_alias_cache(Arc::new(aliases))
                .with_local_source(Arc::new(local));
        }

        let usda = config.sources.usda();
        let fatsecret = config.sources.fatsecret();
        if usda.is_some() || fatsecret.is_some() {
            let http = build_client(&config.sources.http_client())?;
            let resilience = config.resilience();
            let cache = config.cache.to_cache_config();
            if let Some(usda) = usda {
                builder = builder.with_remote_source(Arc::new(UsdaFoodSource::new(
                    usda,
                    http.clone(),
                    &resilience,
                    &cache,
                )));
            }
            if let Some(fatsecret) = fatsecret {
                let source = Arc::new(FatSecretSource::new(fatsecret, http, &resilience, &cache));
                builder = builder
                    .with_remote_source(Arc::clone(&source) as Arc<dyn FoodDataSource>)
                    .with_recipe_source(source);
            }
        } else if config.sources.local_database_url.is_none() {
            warn!("no food sources configured, every meal will use drafted estimates");
        }

        Ok(builder.build())
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Correct, compile and audit a drafted plan
    ///
    /// `keto` forces the keto swap pass even when the draft's own preferences
    /// name another style.
    ///
    /// # Errors
    ///
    /// Returns a schema-validation error if the compiled plan breaks its
    /// output contract. Source failures never surface here.
    pub async fn run(
        &self,
        draft: &MealPlanDraft,
        keto: bool,
        progress: Option<ProgressSender>,
    ) -> AppResult<PipelineOutput> {
        let mut pinned = pin_targets(draft);
        if keto {
            pinned.preferences.style = DietaryStyle::Keto;
        }

        let (corrected, corrections) = self.corrector.correct_plan(&pinned);
        if !corrections.meals.is_empty() {
            info!(
                meals = corrections.meals.len(),
                adjustments = corrections.adjustment_count(),
                swaps = corrections.swap_count(),
                "draft corrected"
            );
        }

        let plan = self.compiler.compile(&corrected, progress).await?;
        let compliance = ComplianceScanner::new(&corrected.preferences).scan_plan(&plan);
        Ok(PipelineOutput {
            plan,
            corrections,
            compliance,
        })
    }

    /// Breaker and cache state of every food source
    pub async fn source_health(&self) -> Vec<SourceHealth> {
        self.resolver.source_health().await
    }

    /// Search the alias cache and every configured source
    pub async fn search(&self, query: &str) -> Vec<FoodSearchHit> {
        self.resolver.search(query).await
    }

    /// Deterministic draft for when no AI draft is available
    #[must_use]
    pub fn fallback_draft(
        &self,
        preferences: DietaryPreferences,
        days: u32,
        daily_calories: Option<f64>,
    ) -> MealPlanDraft {
        FallbackPlanGenerator::new(preferences).generate(days, daily_calories)
    }
}

/// Copy the draft with each meal's estimate pinned as its target
///
/// Correction rewrites estimates, so meals without an explicit target keep
/// the number they were drafted with.
#[must_use]
pub fn pin_targets(draft: &MealPlanDraft) -> MealPlanDraft {
    let mut pinned = draft.clone();
    for meal in pinned.days.iter_mut().flat_map(|day| day.meals.iter_mut()) {
        if meal.target_nutrition.is_none() {
            meal.target_nutrition = Some(meal.estimated_nutrition);
        }
    }
    pinned
}

/// Assembles a pipeline from explicit parts
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    aliases: Option<Arc<FoodAliasCache>>,
    local: Option<Arc<dyn FoodDataSource>>,
    remotes: Vec<Arc<dyn FoodDataSource>>,
    recipes: Option<Arc<dyn RecipeSource>>,
}

impl PipelineBuilder {
    /// Builder with default configuration and no sources
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this configuration
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this alias cache
    #[must_use]
    pub fn with_alias_cache(mut self, aliases: Arc<FoodAliasCache>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    /// Use this local food source; remote sources are then skipped during resolution
    #[must_use]
    pub fn with_local_source(mut self, local: Arc<dyn FoodDataSource>) -> Self {
        self.local = Some(local);
        self
    }

    /// Append a remote food source; sources are consulted in insertion order
    #[must_use]
    pub fn with_remote_source(mut self, remote: Arc<dyn FoodDataSource>) -> Self {
        self.remotes.push(remote);
        self
    }

    /// Use this recipe source for legacy drafts
    #[must_use]
    pub fn with_recipe_source(mut self, recipes: Arc<dyn RecipeSource>) -> Self {
        self.recipes = Some(recipes);
        self
    }

    /// Wire the pipeline
    #[must_use]
    pub fn build(self) -> NutritionPipeline {
        let resolver = Arc::new(IngredientResolver::new(
            self.aliases.unwrap_or_default(),
            self.local,
            self.remotes,
            ResolverSettings::from(&self.config.concurrency),
        ));
        let compiler = NutritionCompiler::new(
            Arc::clone(&resolver),
            self.recipes,
            self.config.guards,
            &self.config.concurrency,
        );
        let corrector = MacroCorrector::new(self.config.guards.correction_bounds());
        NutritionPipeline {
            config: self.config,
            resolver,
            compiler,
            corrector,
        }
    }
}
