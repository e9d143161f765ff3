//! window-tail - Follow one source through a sliding window
//!
//! Reads `[start, start + width)` from a log cache once per interval and
//! prints every envelope it finds. Stops on Ctrl-C.

use anyhow::Result;
use log::{error, info, warn};
use logcache::{
    Client, Context, Envelope, HttpClient, Oauth2Credentials, UreqHttpClient, WindowOptions,
    build_walker, window,
};
use ureq::http::header::{AUTHORIZATION, HeaderValue};
use ureq::http::{Request, Response};

mod settings;

use settings::Settings;

/// Sends a fixed Authorization header with every request
struct StaticTokenHttpClient {
    token: HeaderValue,
    http: UreqHttpClient,
}

impl HttpClient for StaticTokenHttpClient {
    fn execute(&self, mut request: Request<Vec<u8>>) -> logcache::Result<Response<Vec<u8>>> {
        request.headers_mut().insert(AUTHORIZATION, self.token.clone());
        self.http.execute(request)
    }
}

fn build_client(settings: &Settings) -> Result<Client> {
    let client = Client::new(&settings.log_cache_addr);

    if let Some(token) = &settings.auth_token {
        info!("Using AUTH_TOKEN for log cache requests");
        let token = HeaderValue::from_str(token)?;
        return Ok(client.with_http_client(StaticTokenHttpClient {
            token,
            http: UreqHttpClient::new(),
        }));
    }

    if Oauth2Credentials::is_available() {
        let creds = Oauth2Credentials::load()?;
        info!("Authenticating against {} as {}", creds.addr, creds.client_id);
        return Ok(client.with_http_client(creds.client()));
    }

    warn!("No AUTH_TOKEN or UAA credentials found, sending unauthenticated requests");
    if let Some(path) = Oauth2Credentials::default_credentials_path() {
        warn!(
            "To authenticate, either:\n\
             1. Place UAA credentials at: {}\n\
             2. Or set UAA_ADDR, UAA_CLIENT and UAA_CLIENT_SECRET",
            path.display()
        );
    }
    Ok(client)
}

fn print_window(envelopes: &[Envelope], print_timestamps: bool) {
    for envelope in envelopes {
        if print_timestamps {
            println!("{}", envelope.timestamp);
            continue;
        }
        match serde_json::to_string(envelope) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("Failed to encode envelope: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = Settings::from_env()?;
    let client = build_client(&settings)?;

    let ctx = Context::new();
    let on_signal = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
        }
        on_signal.cancel();
    });

    let mut options = WindowOptions::new()
        .with_interval(settings.interval)
        .with_width(settings.width);
    if let Some(start) = settings.start {
        options = options.with_start(start);
    }

    info!(
        "Tailing {} from {} every {:?} over {:?}",
        settings.source_id, settings.log_cache_addr, settings.interval, settings.width
    );

    let walker = build_walker(settings.source_id.clone(), client);
    window(
        &ctx,
        |envelopes| {
            info!("Window returned {} envelopes", envelopes.len());
            print_window(&envelopes, settings.print_timestamps);
            true
        },
        &walker,
        options,
    )
    .await;

    Ok(())
}
