use std::{process, sync::Arc, time::Duration};

use palaver::{
    application::{
        error::AppError,
        feed::FeedService,
        repos::{
            ChangeStream, CommentsRepo, CommunitiesRepo, LogNotifier, Notifier, PostsRepo,
            ProfilesRepo, VotesRepo,
        },
        votes::VoteLedger,
    },
    cache::{CacheConfig, CacheStore, CaptureConfig, ChangeCaptureRouter, ReadThroughCache,
        spawn_sweeper},
    config,
    infra::{
        db::{PgChangeStream, PostgresRepositories},
        error::InfraError,
        http::{self, AppState},
        telemetry,
    },
};
use tokio::task::JoinHandle;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories.clone(), &settings);

    let result = serve_http(&settings, app.state).await;

    for handle in app.background {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    drop(repositories);
    info!(target = "palaver::migrate", "migrations applied");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

struct ApplicationContext {
    state: AppState,
    background: Vec<JoinHandle<()>>,
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> ApplicationContext {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let communities_repo: Arc<dyn CommunitiesRepo> = repositories.clone();
    let profiles_repo: Arc<dyn ProfilesRepo> = repositories.clone();
    let votes_repo: Arc<dyn VotesRepo> = repositories.clone();
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(CacheStore::new(&cache_config));
    let cache = Arc::new(ReadThroughCache::new(cache_config.clone(), store.clone()));

    let mut background = Vec::new();
    if cache_config.enabled {
        let change_stream: Arc<dyn ChangeStream> =
            Arc::new(PgChangeStream::new(repositories.pool().clone()));
        let router = Arc::new(ChangeCaptureRouter::new(
            CaptureConfig::from(&settings.capture),
            store.clone(),
            change_stream,
        ));
        background.extend(router.spawn());
        background.push(spawn_sweeper(store.clone(), cache_config.sweep_interval()));
    }

    let ledger = Arc::new(VoteLedger::new(
        posts_repo.clone(),
        comments_repo.clone(),
        votes_repo,
        notifier,
    ));
    let feed = Arc::new(FeedService::new(
        posts_repo,
        comments_repo,
        communities_repo,
        profiles_repo,
        cache,
        settings.ranking,
    ));

    ApplicationContext {
        state: AppState {
            ledger,
            feed,
            db: repositories,
        },
        background,
    }
}

async fn serve_http(settings: &config::Settings, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "palaver::http",
        addr = %settings.server.addr,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install terminate handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(
        target = "palaver::http",
        grace_secs = grace.as_secs(),
        "shutdown signal received, draining connections"
    );
}
