use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use keyword_ideas::{
    CLIENT_SECRETS_PATH, CREDENTIALS_PATH, CredentialsSource, GoogleAdsClient, get_refresh_token,
};
use tracing_subscriber::EnvFilter;

/// Obtain a Google Ads refresh token through the browser consent flow
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// OAuth client secrets downloaded from the Google Cloud console
    #[arg(short, long, default_value = CLIENT_SECRETS_PATH)]
    file: PathBuf,

    /// Credential file; when it exists its contents are checked instead
    #[arg(long, default_value = CREDENTIALS_PATH)]
    config: PathBuf,

    /// Extra OAuth scope to request (repeatable)
    #[arg(long = "scope")]
    scopes: Vec<String>,

    /// Exit without waiting for Enter
    #[arg(long)]
    no_wait: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("keyword_ideas=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let result = if args.config.exists() {
        show_credentials(&args)
    } else {
        request_refresh_token(&args)
    };

    let status = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    if !args.no_wait {
        print!("Press Enter to Exit");
        let _ = io::stdout().flush();
        let _ = io::stdin().lock().read_line(&mut String::new());
    }
    status
}

fn show_credentials(args: &Args) -> anyhow::Result<()> {
    let credentials = CredentialsSource::File(args.config.clone()).load()?;

    println!("Credentials from {}:", args.config.display());
    println!(" - developer_token: {}", credentials.developer_token);
    println!(" - client_id: {}", credentials.client_id);
    println!(" - client_secret: {}", credentials.client_secret);
    println!(" - refresh_token: {}", credentials.refresh_token);
    println!(
        " - login_customer_id: {}",
        credentials.login_customer_id.as_deref().unwrap_or("not set")
    );

    if GoogleAdsClient::credentials_valid(&credentials)? {
        println!("Credentials are valid.");
    } else {
        println!(
            "Credentials are NOT valid. Remove {} and run again to get a new refresh token.",
            args.config.display()
        );
    }
    Ok(())
}

fn request_refresh_token(args: &Args) -> anyhow::Result<()> {
    let refresh_token = get_refresh_token(&args.file, &args.scopes, |session| {
        println!("Paste this URL into your browser:");
        println!("{}", session.authorization_url);
        println!();
        println!("Waiting for the redirect on port {}...", session.port);
    })?;

    println!();
    println!("Your refresh token is: {}", refresh_token);
    println!(
        "Add it as refresh_token to {} together with developer_token, client_id and client_secret.",
        args.config.display()
    );
    Ok(())
}
