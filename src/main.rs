//! # Social Connect CLI
//!
//! Operator commands for the connection store and OAuth1 signing.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};

use social_connect::config::{AppConfig, ConfigLoader};
use social_connect::connect::ConnectionFactoryRegistry;
use social_connect::crypto::StringKeyGenerator;
use social_connect::crypto::keygen::{self, HexEncodingStringKeyGenerator};
use social_connect::oauth1::{OAuth1Credentials, OAuth1RequestSigner};
use social_connect::repositories::UsersConnectionRepository;
use social_connect::{db, telemetry};

#[derive(Debug, Parser)]
#[command(name = "social-connect", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply database migrations
    Migrate,
    /// Print a random hex key, e.g. for SOCIAL_ENCRYPT_SALT
    Keygen {
        /// Key length in bytes
        #[arg(long, default_value_t = keygen::DEFAULT_KEY_LENGTH)]
        length: usize,
    },
    /// Print the OAuth1 Authorization header for a request
    Sign {
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        consumer_key: String,
        #[arg(long, env = "SOCIAL_CONSUMER_SECRET", hide_env_values = true)]
        consumer_secret: String,
        #[arg(long)]
        token: Option<String>,
        #[arg(long, env = "SOCIAL_TOKEN_SECRET", hide_env_values = true)]
        token_secret: Option<String>,
        /// Request body; form bodies take part in the signature
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List local users connected to provider accounts
    UserIds {
        #[arg(long)]
        provider: String,
        #[arg(long = "provider-user-id", required = true)]
        provider_user_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Migrate => {
            let config = load_config()?;
            let db = db::init_pool(&config).await?;
            db::migrate(&db).await?;
            tracing::info!("Migrations applied");
        }
        Command::Keygen { length } => {
            let generator =
                HexEncodingStringKeyGenerator::new(Box::new(keygen::secure_random_with_length(length)?));
            println!("{}", generator.generate_key());
        }
        Command::Sign {
            method,
            url,
            consumer_key,
            consumer_secret,
            token,
            token_secret,
            body,
            content_type,
        } => {
            telemetry::init_tracing(&AppConfig::default())?;
            let header = sign(
                &method,
                &url,
                credentials(consumer_key, consumer_secret, token, token_secret)?,
                body,
                content_type,
            )?;
            println!("{header}");
        }
        Command::UserIds {
            provider,
            provider_user_ids,
        } => {
            let config = load_config()?;
            let db = db::init_pool(&config).await?;
            let repository = UsersConnectionRepository::new(
                Arc::new(db),
                Arc::new(ConnectionFactoryRegistry::new()),
                config.text_encryptor()?,
            );
            let provider_user_ids: HashSet<String> = provider_user_ids.into_iter().collect();
            for user_id in repository
                .find_user_ids_connected_to(&provider, &provider_user_ids)
                .await?
            {
                println!("{user_id}");
            }
        }
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let config = ConfigLoader::new().load().context("loading configuration")?;
    telemetry::init_tracing(&config)?;
    tracing::debug!(profile = %config.profile, "Loaded configuration");
    Ok(config)
}

fn credentials(
    consumer_key: String,
    consumer_secret: String,
    token: Option<String>,
    token_secret: Option<String>,
) -> Result<OAuth1Credentials> {
    let credentials = OAuth1Credentials::consumer(consumer_key, consumer_secret);
    match (token, token_secret) {
        (Some(token), Some(token_secret)) => Ok(credentials.with_token(token, token_secret)),
        (Some(_), None) => bail!("--token needs a token secret; set SOCIAL_TOKEN_SECRET"),
        (None, _) => Ok(credentials),
    }
}

fn sign(
    method: &str,
    url: &str,
    credentials: OAuth1Credentials,
    body: Option<String>,
    content_type: Option<String>,
) -> Result<String> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))?;
    let url = Url::parse(url).with_context(|| format!("invalid URL '{url}'"))?;

    let mut request = Request::new(method, url);
    if let Some(content_type) = content_type {
        request.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&content_type).context("invalid content type")?,
        );
    }
    if let Some(body) = body {
        *request.body_mut() = Some(body.into());
    }

    OAuth1RequestSigner::new(credentials).sign(&mut request)?;

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .context("signer did not set an Authorization header")?
        .to_str()
        .context("Authorization header is not ASCII")?;
    Ok(header.to_string())
}
