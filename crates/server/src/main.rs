#[tokio::main]
async fn main() -> anyhow::Result<()> {
    argo_rag_server::start().await
}
