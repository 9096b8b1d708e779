//! `easytl` command-line front-end.
//!
//! Streams translations to stdout and manages the stored login. Diagnostics
//! go to the log file, never to stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use easytl::auth::{AccessToken, AuthState, LoginCheck, TokenStore};
use easytl::client::TranslationClient;
use easytl::config::{self, EasyTLConfig};
use easytl::logging::{self, LogLevel};
use easytl::session::SessionSlot;
use easytl::stream::{event_channel, StreamEvent, TranslationOutcome, FAILURE_MARKER};
use easytl::translate::{CredentialMode, InstructionTemplate, Provider, TranslationRequest};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, Stdout};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// Stream translations from the EasyTL API
#[derive(Parser)]
#[command(name = "easytl", version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./easytl.toml, then ~/.config/easytl/config.toml)
    #[arg(long, global = true, env = "EASYTL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the backend URL from the configuration
    #[arg(long, global = true, env = "EASYTL_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Log level for the log file (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Where the access token is stored
    #[arg(long, global = true, env = "EASYTL_TOKEN_FILE", value_name = "FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate text, streaming the result to stdout
    Translate(TranslateArgs),
    /// Log in with a Google ID token or an existing access token
    Login {
        /// Google ID token to exchange for an access token
        #[arg(long, required_unless_present = "access_token", conflicts_with = "access_token")]
        credential: Option<String>,

        /// EasyTL access token to store as is
        #[arg(long)]
        access_token: Option<String>,
    },
    /// Forget the stored login
    Logout,
    /// Show the logged-in account and credit balance
    Status,
    /// Start a credit purchase and print the checkout session id
    Purchase {
        /// Page the payment provider returns to after payment
        /// (default: the backend URL; pass the web app origin instead)
        #[arg(long, value_name = "URL")]
        success_url: Option<String>,

        /// Page the payment provider returns to on cancel (default: the backend URL)
        #[arg(long, value_name = "URL")]
        cancel_url: Option<String>,
    },
    /// Check whether a checkout session was paid
    Verify {
        /// Checkout session id printed by `purchase`
        session_id: String,
    },
    /// List providers and their models
    Models {
        /// Only list this provider's models
        provider: Option<Provider>,
    },
}

#[derive(Args)]
struct TranslateArgs {
    /// Text to translate; read from stdin when omitted
    text: Option<String>,

    /// Target language
    #[arg(short, long)]
    language: Option<String>,

    /// Tone, e.g. "Casual" or "Formal; Polite"
    #[arg(short, long)]
    tone: Option<String>,

    /// Provider (OpenAI, Gemini, Anthropic)
    #[arg(short, long)]
    provider: Option<Provider>,

    /// Model of the provider; its first model when omitted
    #[arg(short, long)]
    model: Option<String>,

    /// Additional instructions for the translator
    #[arg(short, long)]
    instructions: Option<String>,

    /// File with a custom instruction format
    #[arg(long, value_name = "FILE")]
    format: Option<PathBuf>,

    /// Use your own provider API key instead of credits
    #[arg(long, env = "EASYTL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_from(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
        config.validate()?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Err(e) = logging::init_and_store_logging(&config.logging) {
        eprintln!("warning: file logging disabled: {e}");
    }

    let store = match cli.token_file {
        Some(path) => TokenStore::new(path),
        None => TokenStore::default_location()?,
    };
    let client = TranslationClient::new(config.api.clone())?;

    match cli.command {
        Command::Translate(args) => translate(&config, client, store, args).await,
        Command::Login {
            credential,
            access_token,
        } => login(client, store, credential, access_token).await,
        Command::Logout => {
            AuthState::new(client, store).logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Status => status(client, store).await,
        Command::Purchase {
            success_url,
            cancel_url,
        } => purchase(&config, client, store, success_url, cancel_url).await,
        Command::Verify { session_id } => verify(client, store, &session_id).await,
        Command::Models { provider } => {
            list_models(provider);
            Ok(())
        }
    }
}

async fn translate(
    config: &EasyTLConfig,
    client: TranslationClient,
    store: TokenStore,
    args: TranslateArgs,
) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("failed to read text from stdin")?;
            text
        }
    };

    let defaults = &config.defaults;
    let provider = args.provider.unwrap_or(defaults.provider);
    let model = args
        .model
        .or_else(|| defaults.model.clone().filter(|_| provider == defaults.provider));
    let language = args
        .language
        .or_else(|| defaults.language.clone())
        .context("no target language; pass --language or set defaults.language")?;
    let template = match args.format {
        Some(path) => InstructionTemplate::new(
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read '{}'", path.display()))?,
        ),
        None => defaults.template(),
    };

    let mut auth = AuthState::new(client.clone(), store);
    let credentials = match args.api_key {
        Some(key) => CredentialMode::ApiKey { key },
        None => {
            auth.check_login_status(true).await?;
            let token = auth
                .access_token()?
                .filter(|_| auth.is_logged_in())
                .context("not logged in; run `easytl login` or pass --api-key")?;
            CredentialMode::Credits {
                access_token: token.as_str().to_string(),
            }
        }
    };
    let using_credits = credentials.uses_credits();

    let mut builder = TranslationRequest::builder(text)
        .language(language)
        .tone(args.tone.unwrap_or_else(|| defaults.tone.clone()))
        .provider(provider)
        .template(template)
        .credentials(credentials);
    if let Some(model) = model {
        builder = builder.model(model);
    }
    if let Some(instructions) = args.instructions {
        builder = builder.additional_instructions(instructions);
    }
    let request = builder.build()?;

    let (tx, mut rx) = event_channel();
    let mut slot = SessionSlot::new();
    let session_id = slot.start(Arc::new(client), request, tx).await;
    info!(%session_id, "translating");

    let mut output = IncrementalOutput::new(tokio::io::stdout());
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let outcome = loop {
        match next_step(&mut rx, interrupt.as_mut()).await {
            Step::Event(StreamEvent::Update { text }) => output.show(&text).await?,
            Step::Event(StreamEvent::Balance { credits }) => auth.update_credits(credits),
            Step::Event(StreamEvent::Finished { outcome }) => break Some(outcome),
            Step::Closed => break None,
            Step::Interrupted => {
                slot.stop().await;
                output.end_line().await?;
                eprintln!("Translation stopped.");
                break None;
            }
        }
    };
    slot.join().await;

    match outcome {
        Some(TranslationOutcome::Completed(text)) => {
            output.show(&text).await?;
            output.end_line().await?;
            if using_credits {
                eprintln!("Remaining: {}", auth.credits());
            }
            Ok(())
        }
        Some(TranslationOutcome::Failed { reason }) => {
            output.end_line().await?;
            eprintln!("{FAILURE_MARKER}");
            bail!("translation failed: {reason}")
        }
        None => Ok(()),
    }
}

#[derive(Debug, PartialEq)]
enum Step {
    Event(StreamEvent),
    Closed,
    Interrupted,
}

/// Waits for the next session event or the interrupt.
///
/// `interrupt` must outlive the loop calling this: a signal that arrives
/// while the caller is busy with the previous event is only seen if the
/// same listener is polled again.
async fn next_step<F>(rx: &mut UnboundedReceiver<StreamEvent>, interrupt: Pin<&mut F>) -> Step
where
    F: Future,
{
    tokio::select! {
        event = rx.recv() => event.map_or(Step::Closed, Step::Event),
        _ = interrupt => Step::Interrupted,
    }
}

/// Prints a growing text by writing only what was appended since the last
/// update.
struct IncrementalOutput {
    out: Stdout,
    shown: usize,
}

impl IncrementalOutput {
    fn new(out: Stdout) -> Self {
        Self { out, shown: 0 }
    }

    async fn show(&mut self, text: &str) -> Result<()> {
        let fresh = match text.get(self.shown..) {
            Some(fresh) => fresh,
            None => {
                // Not an extension of what is on screen; start over.
                self.out.write_all(b"\n").await?;
                text
            }
        };
        self.out.write_all(fresh.as_bytes()).await?;
        self.out.flush().await?;
        self.shown = text.len();
        Ok(())
    }

    async fn end_line(&mut self) -> Result<()> {
        if self.shown > 0 {
            self.out.write_all(b"\n").await?;
            self.out.flush().await?;
            self.shown = 0;
        }
        Ok(())
    }
}

async fn login(
    client: TranslationClient,
    store: TokenStore,
    credential: Option<String>,
    access_token: Option<String>,
) -> Result<()> {
    let token = match (credential, access_token) {
        (_, Some(token)) => token,
        (Some(credential), None) => client.google_login(&credential).await?,
        (None, None) => bail!("pass --credential or --access-token"),
    };

    let mut auth = AuthState::new(client, store);
    match auth.login(AccessToken::new(token)).await? {
        LoginCheck::Refreshed => {
            println!(
                "Logged in as {} ({}).",
                auth.email().unwrap_or("unknown"),
                auth.credits()
            );
            Ok(())
        }
        LoginCheck::NoValidToken => bail!("the access token is expired or malformed"),
        _ => bail!("login was rejected by the server"),
    }
}

async fn status(client: TranslationClient, store: TokenStore) -> Result<()> {
    let mut auth = AuthState::new(client, store);
    auth.check_login_status(true).await?;

    if auth.is_logged_in() {
        println!("Logged in as {}", auth.email().unwrap_or("unknown"));
        println!("Credits: {:.2}", auth.credits().balance());
        if auth.is_privileged() {
            println!("Privileged account");
        }
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

async fn logged_in_token(auth: &mut AuthState<TranslationClient>) -> Result<AccessToken> {
    auth.check_login_status(true).await?;
    auth.access_token()?
        .filter(|_| auth.is_logged_in())
        .context("not logged in; run `easytl login` first")
}

async fn purchase(
    config: &EasyTLConfig,
    client: TranslationClient,
    store: TokenStore,
    success_url: Option<String>,
    cancel_url: Option<String>,
) -> Result<()> {
    let mut auth = AuthState::new(client.clone(), store);
    let token = logged_in_token(&mut auth).await?;

    let origin = config.api.base_url.trim_end_matches('/');
    let success_url = success_url
        .unwrap_or_else(|| format!("{origin}?verify_session_id={{CHECKOUT_SESSION_ID}}"));
    let cancel_url = cancel_url.unwrap_or_else(|| origin.to_string());

    let checkout = client
        .create_checkout_session(token.as_str(), &success_url, &cancel_url)
        .await?;
    println!("{}", checkout.id);
    match &checkout.url {
        Some(url) => eprintln!("Open {url} to pay."),
        None => eprintln!(
            "The backend returned no payment page; complete checkout {} from the EasyTL web app.",
            checkout.id
        ),
    }
    eprintln!("Then run `easytl verify {}`.", checkout.id);
    Ok(())
}

async fn verify(client: TranslationClient, store: TokenStore, session_id: &str) -> Result<()> {
    let mut auth = AuthState::new(client.clone(), store);
    let token = logged_in_token(&mut auth).await?;

    if !client.verify_payment(token.as_str(), session_id).await? {
        bail!("payment verification failed; contact support if you were charged");
    }

    auth.check_login_status(true).await?;
    println!("Credits added. Balance: {}", auth.credits());
    Ok(())
}

fn list_models(provider: Option<Provider>) {
    let providers = match provider {
        Some(provider) => vec![provider],
        None => Provider::ALL.to_vec(),
    };

    for provider in providers {
        println!("{provider}");
        for (i, model) in provider.models().iter().enumerate() {
            let marker = if i == 0 { " (default)" } else { "" };
            println!("  {model}{marker}");
        }
    }
}
