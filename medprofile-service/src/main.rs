use medprofile_service::create_app;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "medprofile_service=debug,medprofile_core=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    if std::env::var("OPENROUTER_API_KEY").is_err() {
        info!("OPENROUTER_API_KEY not set - insight summarization is disabled");
    }

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let app = create_app().await?;
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    let addr = listener.local_addr()?;

    info!("MedProfile Insight Service starting on {}", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Profile endpoint: GET http://{}/drugs/{{name}}", addr);
    info!("Insights endpoint: POST http://{}/insights", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
