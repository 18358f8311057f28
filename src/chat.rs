use garage_assistant::bootstrap::bootstrap;
use garage_assistant::console::Console;
use garage_assistant::infrastructure::{AppConfig, DefaultBackends};
use garage_assistant::telemetry;
use tokio::io::{stdin, stdout, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("warn");

    let config = AppConfig::load()?;
    // rig's Ollama client reads its endpoint from the environment.
    if std::env::var_os("OLLAMA_API_BASE_URL").is_none() {
        std::env::set_var("OLLAMA_API_BASE_URL", &config.config.llm.base_url);
    }

    eprintln!("Indexing documents in {} ...", config.config.data.dir.display());
    let engine = bootstrap(&config, |key| std::env::var(key).ok(), &DefaultBackends).await?;
    eprintln!(
        "Ready: {} chunks indexed. Ask about your car, /history to review, /quit to leave.",
        engine.rag().chunk_count()
    );

    let mut console = Console::new(engine.new_session(), BufReader::new(stdin()), stdout());
    console.run().await?;
    Ok(())
}
