#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exam_marking::run().await {
        eprintln!("exam-marking fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
