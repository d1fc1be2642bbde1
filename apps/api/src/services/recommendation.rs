//! The recommendation pipeline.
//!
//! With a catalog configured, candidates come from the structured store, are
//! optionally re-ranked by embedding similarity, ranked by the language model
//! and reconciled back to canonical names. Without one, the model recommends
//! freely, grounded on retrieved recipe documents when an index is available.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::catalog::{
    passes_hard_filters, CandidateQuery, NameMatch, RecipeCatalog, DEFAULT_CANDIDATE_LIMIT,
};
use super::embedder::Embedder;
use super::llm::LanguageModel;
use super::llm_text::{
    clean_recipe_name, is_placeholder, needs_breakdown, parse_recipe_sections, parse_step_lines,
};
use super::pinecone::{DocumentIndex, RETRIEVAL_K};
use super::prompts;
use super::reconciler::reconcile;
use crate::error::Result;
use crate::models::{format_ingredients, Candidate, CatalogRecipe, ParsedRecipe, Preferences};

pub const NO_RECIPES_MESSAGE: &str =
    "Sorry, no recipes found matching your preferences. Try a different cuisine or meal type.";

/// Above this many hard-filtered candidates the semantic refiner runs.
const SEMANTIC_THRESHOLD: usize = 10;
const RANKED_CANDIDATES: usize = 10;
const MIN_FUZZY_NAME_CHARS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub text: String,
    pub mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RecommendationService {
    llm: Arc<dyn LanguageModel>,
    catalog: Option<Arc<dyn RecipeCatalog>>,
    embedder: Option<Arc<dyn Embedder>>,
    documents: Option<Arc<dyn DocumentIndex>>,
}

impl RecommendationService {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            catalog: None,
            embedder: None,
            documents: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn RecipeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_documents(mut self, documents: Arc<dyn DocumentIndex>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn catalog_enabled(&self) -> bool {
        self.catalog.is_some()
    }

    pub fn rag_enabled(&self) -> bool {
        self.documents.is_some()
    }

    pub fn llm(&self) -> Arc<dyn LanguageModel> {
        Arc::clone(&self.llm)
    }

    pub async fn recommend(&self, preferences: &Preferences) -> Result<Recommendation> {
        match &self.catalog {
            Some(catalog) => self.recommend_from_catalog(catalog.as_ref(), preferences).await,
            None => self.recommend_freeform(preferences).await,
        }
    }

    async fn recommend_from_catalog(
        &self,
        catalog: &dyn RecipeCatalog,
        preferences: &Preferences,
    ) -> Result<Recommendation> {
        let query = CandidateQuery {
            cuisine: preferences.region.clone(),
            meal_type: preferences.meal_type.clone(),
            max_minutes: i32::try_from(preferences.max_time_minutes()).unwrap_or(i32::MAX),
            exclude_allergens: preferences.allergies.clone(),
            tastes: preferences.taste_preferences.clone(),
            limit: DEFAULT_CANDIDATE_LIMIT,
        };

        let mut candidates = catalog.find_candidates(&query).await?;
        info!(
            "🔎 {} candidates for {} {} within {} mins",
            candidates.len(),
            query.cuisine,
            query.meal_type,
            query.max_minutes
        );

        if candidates.is_empty() {
            return Ok(Recommendation {
                text: NO_RECIPES_MESSAGE.to_string(),
                mapping: BTreeMap::new(),
            });
        }

        if candidates.len() > SEMANTIC_THRESHOLD {
            if let Some(embedder) = &self.embedder {
                candidates = self
                    .refine(catalog, embedder.as_ref(), preferences, &query, candidates)
                    .await;
            }
        }

        candidates.truncate(RANKED_CANDIDATES);
        let names: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        let summary = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| c.summary_line(i + 1))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = prompts::ranking(
            &preferences.to_prompt_text(),
            &summary,
            candidates.len(),
            &names,
        );
        debug!("Ranking with {}", self.llm.model_name());
        let reply = self.llm.complete(&prompt).await?;
        debug!(
            "Ranking reply: {}",
            reply.chars().take(500).collect::<String>()
        );

        let reconciled = reconcile(&reply, &names);
        info!("✅ Ranked {} recipes", reconciled.mapping.len());
        Ok(Recommendation {
            text: reconciled.text,
            mapping: reconciled.mapping,
        })
    }

    /// Semantic matches first, then the remaining hard-filtered candidates.
    /// Semantic rows are held to the same hard filters as the candidates.
    async fn refine(
        &self,
        catalog: &dyn RecipeCatalog,
        embedder: &dyn Embedder,
        preferences: &Preferences,
        query: &CandidateQuery,
        candidates: Vec<Candidate>,
    ) -> Vec<Candidate> {
        let query_text = format!(
            "{} {} with {}",
            preferences.region,
            preferences.meal_type,
            preferences.taste_preferences.join(", ")
        );

        let embedding = match embedder.embed(&query_text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding failed, keeping hard-filter order: {}", e);
                return candidates;
            }
        };

        let semantic = match catalog.semantic_search(&embedding, RANKED_CANDIDATES).await {
            Ok(rows) => rows
                .into_iter()
                .filter(|c| passes_hard_filters(c, query))
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!("Semantic search failed, keeping hard-filter order: {}", e);
                return candidates;
            }
        };

        merge_semantic(semantic, candidates)
    }

    async fn recommend_freeform(&self, preferences: &Preferences) -> Result<Recommendation> {
        let preferences_text = preferences.to_prompt_text();
        let context = self.retrieve_context(&preferences_text).await;
        let reply = self
            .llm
            .complete(&prompts::recommend(&preferences_text, context.as_deref()))
            .await?;

        info!("✅ Generated freeform recommendations");
        Ok(Recommendation {
            text: reply,
            mapping: BTreeMap::new(),
        })
    }

    async fn retrieve_context(&self, query: &str) -> Option<String> {
        let documents = self.documents.as_ref()?;
        match documents.retrieve(query, RETRIEVAL_K).await {
            Ok(chunks) if !chunks.is_empty() => Some(chunks.join("\n\n")),
            Ok(_) => None,
            Err(e) => {
                warn!("Document retrieval failed, continuing without context: {}", e);
                None
            }
        }
    }

    /// Ingredients, steps and tips for `recipe_name`.
    ///
    /// Catalog rows are preferred; placeholders such as `Recipe 2` and names
    /// the catalog does not know are generated by the model instead.
    pub async fn detailed_recipe(&self, recipe_name: &str, preferences: &str) -> Result<ParsedRecipe> {
        let name = clean_recipe_name(recipe_name);

        let stored = match &self.catalog {
            Some(_) if is_placeholder(&name) => {
                warn!("'{}' is a placeholder, generating instead of looking up", name);
                None
            }
            Some(catalog) => lookup(catalog.as_ref(), &name).await?,
            None => None,
        };

        let (mut parsed, raw) = match stored.filter(|r| !r.steps.is_empty()) {
            Some(recipe) => {
                info!("📖 Found '{}' in catalog", recipe.name);
                let raw = recipe.steps.join("\n\n");
                (
                    ParsedRecipe {
                        ingredients: format_ingredients(&recipe.ingredients),
                        steps: recipe.steps,
                        tips: recipe.tips,
                    },
                    raw,
                )
            }
            None => {
                if self.catalog.is_some() {
                    warn!("'{}' not in catalog, falling back to generation", name);
                }
                let context = self.retrieve_context(&name).await;
                let reply = self
                    .llm
                    .complete(&prompts::detail(&name, preferences, context.as_deref()))
                    .await?;
                (parse_recipe_sections(&reply), reply)
            }
        };

        if needs_breakdown(&parsed.steps) {
            let instructions = if parsed.steps.is_empty() {
                raw
            } else {
                parsed.steps.join("\n\n")
            };
            let reply = self
                .llm
                .complete(&prompts::step_breakdown(&name, &instructions))
                .await?;
            let steps = parse_step_lines(&reply);
            if steps.is_empty() {
                warn!("Step breakdown for '{}' produced no steps", name);
            } else {
                info!("✂️ Broke '{}' into {} steps", name, steps.len());
                parsed.steps = steps;
            }
        }

        Ok(parsed)
    }

    pub async fn ingredient_alternatives(
        &self,
        missing_ingredient: &str,
        recipe_context: &str,
    ) -> Result<String> {
        let reply = self
            .llm
            .complete(&prompts::alternatives(missing_ingredient, recipe_context))
            .await?;
        Ok(reply)
    }
}

/// Exact name first; prefix and substring patterns only for names long
/// enough to be meaningful.
async fn lookup(catalog: &dyn RecipeCatalog, name: &str) -> Result<Option<CatalogRecipe>> {
    if let Some(recipe) = catalog.find_by_name(name, NameMatch::Exact).await? {
        return Ok(Some(recipe));
    }
    if name.chars().count() < MIN_FUZZY_NAME_CHARS {
        return Ok(None);
    }
    for mode in [NameMatch::Prefix, NameMatch::Contains] {
        if let Some(recipe) = catalog.find_by_name(name, mode).await? {
            debug!("Matched '{}' to '{}' via {:?}", name, recipe.name, mode);
            return Ok(Some(recipe));
        }
    }
    Ok(None)
}

fn merge_semantic(semantic: Vec<Candidate>, candidates: Vec<Candidate>) -> Vec<Candidate> {
    let seen: HashSet<String> = semantic
        .iter()
        .take(RANKED_CANDIDATES)
        .map(|c| c.id.clone())
        .collect();
    semantic
        .into_iter()
        .take(RANKED_CANDIDATES)
        .chain(
            candidates
                .into_iter()
                .filter(|c| !seen.contains(&c.id))
                .take(RANKED_CANDIDATES),
        )
        .collect()
}
