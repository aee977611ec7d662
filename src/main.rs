/// API сервер сегментации клиентов

use customer_segmentation::{
    api::{create_router, AppState},
    config::ServerSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = ServerSettings::from_env()?;
    let app = create_router(AppState::default());

    let addr = settings.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
