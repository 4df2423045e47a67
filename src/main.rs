#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = skillforge_rust::run().await {
        eprintln!("skillforge-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
