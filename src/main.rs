use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use potluck::auth::AccountManager;
use potluck::config::{Cli, Command, Config};
use potluck::state::AppState;
use potluck::{db, routes, scaffold, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Serve);

    // Scaffolding never touches the data directory
    if let Command::Scaffold { app, dir } = &command {
        for path in scaffold::scaffold(app, dir)? {
            println!("created {}", dir.join(path).display());
        }
        return Ok(());
    }

    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    std::fs::create_dir_all(config.uploads_path())?;

    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    match command {
        Command::Serve => {
            let state = AppState {
                db: pool,
                config: config.clone(),
            };
            let app = routes::app(state);

            let addr: SocketAddr =
                format!("{}:{}", config.server.host, config.server.port).parse()?;
            tracing::info!("Listening on http://{}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Command::CreateSuperuser {
            email,
            name,
            password,
        } => {
            let conn = pool.get()?;
            let account = AccountManager::new(&conn, config.auth.hash_cost)
                .create_privileged_account(&email, &name, &password)?;
            println!("Superuser {} created", account.email);
        }
        Command::Seed { fixture } => {
            let fixture = seed::load_fixture(fixture.as_deref())?;
            let conn = pool.get()?;
            let summary = seed::seed(&conn, config.auth.hash_cost, &fixture)?;
            println!(
                "Seeded {} users ({} already present), {} feed posts, {} ingredients",
                summary.users_created,
                summary.users_skipped,
                summary.feeds_created,
                summary.ingredients_created
            );
        }
        Command::Scaffold { .. } => {}
    }

    Ok(())
}
