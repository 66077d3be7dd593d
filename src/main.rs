//! Demo binary: binds the server from [`httpfromtcp::server`] and wires
//! up the handful of routes the original course project used to exercise
//! the writer's state machine.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

use httpfromtcp::config::Config;
use httpfromtcp::headers::Headers;
use httpfromtcp::request::Request;
use httpfromtcp::response::{StatusCode, Writer};
use httpfromtcp::server::{Handler, Server};

struct DemoHandler {
    client: reqwest::Client,
    config: Config,
}

#[async_trait]
impl Handler for DemoHandler {
    async fn handle(&self, writer: &mut Writer<'_, TcpStream>, request: &Request) {
        let target = request.request_line.request_target.as_str();

        let result = if let Some(rest) = target.strip_prefix("/httpbin/") {
            self.proxy_httpbin(writer, rest).await
        } else {
            match target {
                "/yourproblem" => write_page(writer, StatusCode::BAD_REQUEST, YOUR_PROBLEM).await,
                "/myproblem" => write_page(writer, StatusCode::INTERNAL_SERVER_ERROR, MY_PROBLEM).await,
                _ => write_page(writer, StatusCode::OK, SUCCESS).await,
            }
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, target, "handler failed to complete the response");
        }
    }
}

impl DemoHandler {
    /// Proxies `GET {upstream_base}/{rest}` and streams the upstream body
    /// back as a chunked response, closing with trailers carrying the
    /// streamed length and a running SHA-256 digest.
    async fn proxy_httpbin(
        &self,
        writer: &mut Writer<'_, TcpStream>,
        rest: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let url = format!("{}/{}", self.config.upstream_base, rest);
        tracing::debug!(url, "proxying upstream request");

        let upstream = self.client.get(&url).send().await?;

        writer.write_status_line(StatusCode::OK).await?;

        let mut headers = Headers::new();
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Trailer", "X-Content-SHA256, X-Content-Length");
        writer.write_headers(&headers).await?;

        let mut hasher = Sha256::new();
        let mut total_len = 0usize;
        let mut body = upstream.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            total_len += chunk.len();
            writer.write_chunked_body(&chunk).await?;
        }
        writer.write_chunked_body_done().await?;

        let mut trailers = Headers::new();
        trailers.set("X-Content-SHA256", hex::encode(hasher.finalize()));
        trailers.set("X-Content-Length", total_len.to_string());
        writer.write_trailers(&trailers).await?;

        Ok(())
    }
}

async fn write_page(
    writer: &mut Writer<'_, TcpStream>,
    status: StatusCode,
    body: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = body.as_bytes();
    writer.write_status_line(status).await?;

    let mut headers = Headers::default_response_headers(body.len());
    headers.override_header("Content-Type", "text/html");
    writer.write_headers(&headers).await?;

    writer.write_body(body).await?;
    Ok(())
}

const YOUR_PROBLEM: &str = "<html>\n\
\t<head>\n\
\t\t<title>400 Bad Request</title>\n\
\t</head>\n\
\t<body>\n\
\t\t<h1>Bad Request</h1>\n\
\t\t<p>Your request honestly kinda sucked.</p>\n\
\t</body>\n\
</html>\n";

const MY_PROBLEM: &str = "<html>\n\
\t<head>\n\
\t\t<title>500 Internal Server Error</title>\n\
\t</head>\n\
\t<body>\n\
\t\t<h1>Internal Server Error</h1>\n\
\t\t<p>Okay, you know what? This one is on me.</p>\n\
\t</body>\n\
</html>\n";

const SUCCESS: &str = "<html>\n\
\t<head>\n\
\t\t<title>200 OK</title>\n\
\t</head>\n\
\t<body>\n\
\t\t<h1>Success!</h1>\n\
\t\t<p>Your request was an absolute banger.</p>\n\
\t</body>\n\
</html>\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let handler = Arc::new(DemoHandler {
        client: reqwest::Client::new(),
        config: config.clone(),
    });

    let server = Server::serve(&config.addr(), handler).await?;
    tracing::info!(addr = %server.local_addr(), "server started");

    wait_for_shutdown_signal().await;

    server.close();
    tracing::info!("server gracefully stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
