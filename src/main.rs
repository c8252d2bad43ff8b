use std::io::{self, IsTerminal, Read};

use anyhow::{Result, anyhow};
use clap::Parser;

use llm_page_translator::Config;

#[derive(Parser, Debug)]
#[command(
    name = "llm-page-translator",
    version,
    about = "Translate the visible text of an HTML page in place using an LLM"
)]
struct Cli {
    /// Target language code (default from settings, e.g. zh-CN)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Model name (e.g. qwen-mt-turbo)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides settings and DASHSCOPE_API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Chat-completions endpoint URL
    #[arg(long = "endpoint")]
    endpoint: Option<String>,

    /// HTML file to translate (defaults to stdin)
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Translate only when the page language is marked always-translate
    #[arg(long = "auto")]
    auto: bool,

    /// Run the background HTTP service on the given address instead
    #[arg(long = "serve")]
    serve: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    llm_page_translator::logging::init(cli.verbose)?;

    let config = Config {
        lang: cli.lang,
        model: cli.model,
        key: cli.key,
        endpoint: cli.endpoint,
        settings_path: cli.read_settings,
        auto: cli.auto,
    };

    if let Some(addr) = cli.serve {
        return llm_page_translator::serve(config, addr).await;
    }

    let input = match cli.data.as_deref() {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| anyhow!("failed to read {}: {}", path, err))?,
        None => {
            if io::stdin().is_terminal() {
                return Err(anyhow!("no input: pipe an HTML document or pass --data"));
            }
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let output = llm_page_translator::run(config, input).await?;
    println!("{output}");
    Ok(())
}
