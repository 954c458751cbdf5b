use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use npc_voice_relay::voice::{EdgeTts, SpeechSynthesizer, voice_for};
use npc_voice_relay::{ApiServerBuilder, AudioStore, Config};

/// NPC relay - voice and dialogue backend for game NPCs
#[derive(Parser)]
#[command(name = "npc-relay", version, about)]
struct Cli {
    /// Port to listen on (overrides `PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Public base URL for audio links (overrides `BASE_URL`)
    #[arg(long)]
    base_url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize one line with the configured TTS engine
    TestTts {
        /// Voice selector ("hombre" or "mujer")
        #[arg(short, long, default_value = "hombre")]
        gender: String,
        /// Text to speak
        #[arg(default_value = "Che, ¿me escuchás? Esto es una prueba de voz.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity, RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,npc_voice_relay=info",
        1 => "info,npc_voice_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_with_options(cli.port, cli.base_url.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(Command::TestTts { gender, text }) = cli.command {
        return test_tts(&config, &gender, &text).await;
    }

    tracing::info!(
        port = config.port,
        base_url = %config.base_url,
        groq_key = config.has_api_key(),
        stt_model = %config.voice.stt_model,
        llm_model = %config.dialogue.model,
        tts = %config.voice.tts_bin,
        "starting NPC relay"
    );
    if !config.has_api_key() {
        tracing::warn!("GROQ_API_KEY is not set, transcription and chat will fail until it is");
    }

    let store_timing = config.store;
    let server = ApiServerBuilder::from_config(config)?.build();

    // Runs until the runtime shuts down
    let _sweeper = server
        .state()
        .store
        .clone()
        .spawn_sweeper(store_timing.sweep_interval, store_timing.retention);

    server.run().await?;

    Ok(())
}

/// Synthesize a single line and print where it landed
async fn test_tts(config: &Config, gender: &str, text: &str) -> anyhow::Result<()> {
    let store = Arc::new(AudioStore::open(&config.data_dir)?);
    let synthesizer = SpeechSynthesizer::new(Arc::new(EdgeTts::locate(&config.voice.tts_bin)), store.clone())
        .with_timeout(config.voice.tts_timeout);

    let voice = voice_for(gender);
    println!("Synthesizing with {voice}: \"{text}\"");

    let file = synthesizer.synthesize(text, voice).await?;
    println!("Wrote {}", store.audio_dir().join(file).display());

    Ok(())
}
