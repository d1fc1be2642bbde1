use crate::{
    config::Config,
    error::Result,
    routes::{api_routes, root_route},
    services::{
        image_generator::{GeminiImageBackend, LocalDiffusionBackend},
        GeminiClient, ImageGenerator, PgRecipeCatalog, PineconeIndex, RecommendationService,
        SessionStore, SupabaseClient, TopRecipeStore, UserService,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use std::net::TcpListener;
use std::sync::Arc;

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct AppServices {
    pub recommender: web::Data<RecommendationService>,
    pub images: web::Data<ImageGenerator>,
    pub sessions: web::Data<SessionStore>,
    pub top_recipes: web::Data<TopRecipeStore>,
    pub users: web::Data<UserService>,
}

impl AppServices {
    pub fn new(
        recommender: RecommendationService,
        images: ImageGenerator,
        sessions: SessionStore,
        top_recipes: TopRecipeStore,
        users: UserService,
    ) -> Self {
        Self {
            recommender: web::Data::new(recommender),
            images: web::Data::new(images),
            sessions: web::Data::new(sessions),
            top_recipes: web::Data::new(top_recipes),
            users: web::Data::new(users),
        }
    }

    /// Build every service the configuration enables.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let gemini = Arc::new(GeminiClient::from_config(config));

        let mut recommender =
            RecommendationService::new(gemini.clone()).with_embedder(gemini.clone());

        match &config.database_url {
            Some(url) => {
                let catalog = PgRecipeCatalog::connect_lazy(url)
                    .context("Failed to configure recipe catalog")?;
                recommender = recommender.with_catalog(Arc::new(catalog));
                info!("📚 Recipe catalog enabled");
            }
            None => warn!("DATABASE_URL not set, recommendations are generated freely"),
        }

        if let Some((api_key, host)) = config.pinecone() {
            let index = PineconeIndex::new(api_key, host, gemini.clone())
                .context("Failed to initialize Pinecone client")?;
            recommender = recommender.with_documents(Arc::new(index));
            info!("🔎 Retrieval context enabled");
        }

        let mut images = ImageGenerator::new(gemini.clone())
            .with_gemini(Arc::new(GeminiImageBackend::new(gemini.clone())));
        if let Some(url) = &config.diffusion_url {
            images = images.with_local(Arc::new(LocalDiffusionBackend::new(url)));
            info!("🎨 Local diffusion backend at {}", url);
        }

        let top_recipes = TopRecipeStore::connect(&config.top_recipes_db_path)
            .await
            .context("Failed to open top recipes database")?;

        let users = UserService::new(
            config
                .supabase()
                .map(|(url, key)| SupabaseClient::new(url, key)),
        );
        if !users.enabled() {
            warn!("Supabase not configured, user endpoints are disabled");
        }

        Ok(Self::new(
            recommender,
            images,
            SessionStore::in_memory(config.session_ttl()),
            top_recipes,
            users,
        ))
    }

    /// Register state and routes on an app or test service.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.recommender.clone())
            .app_data(self.images.clone())
            .app_data(self.sessions.clone())
            .app_data(self.top_recipes.clone())
            .app_data(self.users.clone())
            .service(root_route())
            .service(api_routes());
    }
}

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))?;
        info!("Starting server at http://{}:{}", self.host, self.port);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    /// This is useful for testing where we want to use a random port
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let services = AppServices::from_config(&self.config).await?;

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            let services = services.clone();
            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .configure(move |cfg| services.register(cfg))
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
