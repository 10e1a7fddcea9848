#[tokio::main]
async fn main() -> anyhow::Result<()> {
    page_summarizer::telemetry::init();
    let cfg = page_summarizer::config::Config::load()?;

    let (app, port) = page_summarizer::build_app(cfg);

    use tracing::info;
    let addr = std::net::SocketAddr::from(([0,0,0,0], port));
    info!(%addr, "server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    page_summarizer::serve(listener, app).await?;
    Ok(())
}
