use bulk_log_appender::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::main().await
}
