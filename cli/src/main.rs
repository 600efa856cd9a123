use clap::{Parser, Subcommand};
use serde_json::Value;
use shinami::config::{DEFAULT_API_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};
use shinami::{ShinamiClient, ShinamiConfig, ShinamiError, Timeouts};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing API key; pass --api-key or set SHINAMI_API_KEY")]
    MissingApiKey,
    #[error(transparent)]
    Shinami(#[from] ShinamiError),
    #[error("--params must be a JSON array")]
    ParamsNotArray,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "shinami-cli", about = "Shinami key and wallet JSON-RPC CLI")]
struct Cli {
    #[arg(long, env = "SHINAMI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "SHINAMI_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "SHINAMI_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    #[arg(long, env = "SHINAMI_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a session token from a secret.
    CreateSession { secret: String },
    /// Create a wallet and print its address.
    CreateWallet { wallet_id: String, session_token: String },
    /// Print the address of an existing wallet.
    GetWallet { wallet_id: String },
    /// Sign base64 transaction bytes and print the signature.
    SignTx {
        wallet_id: String,
        session_token: String,
        tx_bytes: String,
    },
    /// Send a raw request and print the result object.
    Call {
        /// Endpoint path, e.g. /wallet/v1
        endpoint: String,
        method: String,
        #[arg(long, default_value = "[]")]
        params: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = build_config(&cli)?;
    let client = ShinamiClient::from_config(&config)?;
    tracing::debug!(api_url = client.api_url(), "client ready");

    match cli.command {
        Command::CreateSession { secret } => println!("{}", client.create_session(&secret).await?),
        Command::CreateWallet { wallet_id, session_token } => {
            println!("{}", client.create_wallet(&wallet_id, &session_token).await?);
        }
        Command::GetWallet { wallet_id } => println!("{}", client.get_wallet(&wallet_id).await?),
        Command::SignTx { wallet_id, session_token, tx_bytes } => {
            let signature = client
                .sign_transaction_block(&wallet_id, &session_token, &tx_bytes)
                .await?;
            println!("{signature}");
        }
        Command::Call { endpoint, method, params } => {
            let params = parse_params(&params)?;
            let result = client.call(&endpoint, &method, &params).await?;
            print_json(&Value::Object(result))?;
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ShinamiConfig, CliError> {
    let api_key = cli.api_key.clone().ok_or(CliError::MissingApiKey)?;
    let timeouts = Timeouts { request_secs: cli.request_timeout_secs, connect_secs: cli.connect_timeout_secs };
    Ok(ShinamiConfig::new(api_key)?
        .with_api_url(&cli.api_url)
        .with_timeouts(timeouts))
}

fn parse_params(raw: &str) -> Result<Vec<Value>, CliError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => Ok(items),
        _ => Err(CliError::ParamsNotArray),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_params_accepts_array() {
        let params = parse_params(r#"["w1", 2, {"k": true}]"#).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0], Value::from("w1"));
    }

    #[test]
    fn parse_params_rejects_object() {
        assert!(matches!(parse_params(r#"{"a": 1}"#), Err(CliError::ParamsNotArray)));
    }

    #[test]
    fn parse_params_rejects_garbage() {
        assert!(matches!(parse_params("nope"), Err(CliError::InvalidJson(_))));
    }

    #[test]
    fn cli_parses_sign_tx() {
        let cli = Cli::try_parse_from(["shinami-cli", "--api-key", "k1", "sign-tx", "w1", "tok", "AAEC"]).unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("k1"));
        assert!(matches!(
            cli.command,
            Command::SignTx { ref wallet_id, ref tx_bytes, .. } if wallet_id == "w1" && tx_bytes == "AAEC"
        ));
    }

    #[test]
    fn timeout_flags_reach_config() {
        let cli = Cli::try_parse_from([
            "shinami-cli",
            "--api-key",
            "k1",
            "--request-timeout-secs",
            "5",
            "--connect-timeout-secs",
            "2",
            "get-wallet",
            "w1",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.timeouts, Timeouts { request_secs: 5, connect_secs: 2 });
    }

    #[test]
    fn missing_api_key_is_reported() {
        let mut cli = Cli::try_parse_from(["shinami-cli", "get-wallet", "w1"]).unwrap();
        cli.api_key = None;
        assert!(matches!(build_config(&cli), Err(CliError::MissingApiKey)));
    }

    #[test]
    fn cli_call_defaults_to_empty_params() {
        let cli = Cli::try_parse_from(["shinami-cli", "--api-key", "k1", "call", "/wallet/v1", "m"]).unwrap();
        assert!(matches!(cli.command, Command::Call { ref params, .. } if params == "[]"));
    }
}
