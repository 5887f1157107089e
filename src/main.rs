use std::sync::Arc;

use pharmesol_agent::config::{AgentConfig, DirectoryConfig};
use pharmesol_agent::demo::Demo;
use pharmesol_agent::directory::DirectoryClient;
use pharmesol_agent::directory::mock_server::{MockDirectory, MockDirectoryServer};
use pharmesol_agent::llm::{self, LlmConfig, create_provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let agent = AgentConfig::from_env();
    let mut directory_config = DirectoryConfig::from_env()?;

    // Serve the seeded directory in-process when asked to
    let mock = if directory_config.is_local() {
        let server = MockDirectoryServer::spawn(MockDirectory::seeded()).await?;
        directory_config.base_url = server.base_url();
        Some(server)
    } else {
        None
    };

    eprintln!("🤖 Pharmesol Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Assistant: {}", agent.bot_name);
    eprintln!("   Directory: {}", directory_config.base_url);

    let directory = Arc::new(DirectoryClient::new(directory_config)?);

    // Create and probe the LLM provider; any failure means manual mode
    let llm = match LlmConfig::from_env() {
        Some(config) => {
            eprintln!("   Model: {}", config.model);
            let provider = create_provider(&config)?;
            if llm::probe(provider.as_ref()).await {
                Some(provider)
            } else {
                None
            }
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, using manual mode");
            None
        }
    };
    eprintln!(
        "   Mode: {}\n",
        if llm.is_some() { "AI-assisted" } else { "manual" }
    );

    let mut demo = Demo::new(agent, directory, llm, mock.is_some());
    demo.run().await?;

    drop(mock);
    Ok(())
}
