use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use keyword_ideas::{
    CLIENT_SECRETS_PATH, CREDENTIALS_PATH, CredentialsSource, GeoTargetQuery, GeoTargetScope,
    IdeasOutput, KeywordIdeasError, KeywordIdeasQuery, OutputFormat, get_refresh_token,
    run_keyword_ideas,
};
use tracing_subscriber::EnvFilter;

/// Fetch keyword ideas from the Google Ads keyword planner
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Comma-separated country codes or geo names, e.g. "US,CA"
    #[arg(short, long)]
    geos: String,

    /// Language code, name or id, e.g. "en" or "zh_CN"
    #[arg(short, long)]
    lang: String,

    /// Comma-separated seed keywords
    #[arg(short, long)]
    keywords: String,

    /// Page URL to seed ideas from
    #[arg(short, long)]
    page_url: Option<String>,

    /// Which geo suggestions to keep: country, any, or a target type such as City
    #[arg(long, default_value = "country")]
    geo_scope: GeoTargetScope,

    /// Credential file
    #[arg(long, default_value = CREDENTIALS_PATH)]
    config: PathBuf,

    /// Account to query instead of the configured login customer id
    #[arg(long)]
    customer_id: Option<String>,

    /// Output shape: table, records, compact, text or raw
    #[arg(short, long, default_value = "table")]
    out: String,

    /// Where to save table results as CSV
    #[arg(long, default_value = "./last_results.csv")]
    csv: PathBuf,

    /// Where to save table results as HTML
    #[arg(long)]
    html: Option<PathBuf>,

    /// Include adult keywords
    #[arg(long)]
    adult: bool,

    /// Annotate ideas with keyword concepts
    #[arg(long)]
    with_annotations: bool,

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

    let status = if args.config.exists() {
        match run(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report_error(&e);
                ExitCode::FAILURE
            }
        }
    } else {
        bootstrap_credentials(&args);
        ExitCode::from(2)
    };

    if !args.no_wait {
        wait_for_enter();
    }
    status
}

fn run(args: &Args) -> anyhow::Result<()> {
    let format: OutputFormat = args.out.parse()?;
    let mut query = KeywordIdeasQuery::new(&args.geos, &args.lang, &args.keywords)
        .output(format)
        .csv_file(&args.csv);
    query.geo = GeoTargetQuery::new(&args.geos).scope(args.geo_scope.clone());
    query.include_adult = args.adult;
    query.with_annotations = args.with_annotations;
    if let Some(url) = &args.page_url {
        query = query.page_url(url);
    }
    if let Some(id) = &args.customer_id {
        query = query.customer_id(id);
    }
    if let Some(path) = &args.html {
        query = query.html_file(path);
    }

    println!("Processing:");
    println!(" - geos: {} ({})", query.geo.names.join(", "), query.geo.scope);
    println!(" - lang: {}", args.lang);
    println!(" - keywords: {}", query.keywords.join(", "));
    if let Some(url) = &query.page_url {
        println!(" - page_url: {}", url);
    }
    println!(" - out: {}", format);
    println!();

    let outcome = run_keyword_ideas(&CredentialsSource::File(args.config.clone()), &query)?;

    match &outcome.output {
        output if output.is_empty() => println!("RESULT IS EMPTY"),
        IdeasOutput::Table(table) => {
            println!("{}", table.shortly());
            println!("Results saved to {}", args.csv.display());
        }
        IdeasOutput::Text(text) => print!("{}", text),
        IdeasOutput::Raw(response) => println!("{}", serde_json::to_string_pretty(response)?),
        IdeasOutput::Records(records) => println!("{}", serde_json::to_string_pretty(records)?),
        IdeasOutput::Compact(records) => println!("{}", serde_json::to_string_pretty(records)?),
    }

    println!();
    println!("Query:");
    print!("{}", outcome.report);
    Ok(())
}

/// Walk the user through creating a refresh token when no credential file exists
fn bootstrap_credentials(args: &Args) {
    println!(
        "Credential file {} not found, starting the refresh token flow",
        args.config.display()
    );

    let result = get_refresh_token(CLIENT_SECRETS_PATH, &[], |session| {
        println!("Paste this URL into your browser:");
        println!("{}", session.authorization_url);
    });

    match result {
        Ok(refresh_token) => {
            println!();
            println!("Your refresh token is: {}", refresh_token);
            println!(
                "Add it as refresh_token to {} together with developer_token, client_id and client_secret.",
                args.config.display()
            );
        }
        Err(e) => report_error(&anyhow::Error::new(e)),
    }
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<KeywordIdeasError>() {
        Some(KeywordIdeasError::ExternalService {
            request_id,
            code,
            details,
        }) => {
            eprintln!(
                "Request ID \"{}\" failed, status \"{}\", details:",
                request_id, code
            );
            for detail in details {
                eprintln!(" - {}", detail.message);
                for field in &detail.field_path {
                    eprintln!(" - - on field: {}", field);
                }
            }
        }
        _ => eprintln!("Error: {:#}", error),
    }
}

fn wait_for_enter() {
    print!("Press Enter to Exit");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
