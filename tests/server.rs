//! End-to-end test of the acceptor loop: a real TCP connection, a
//! handler exercising every writer operation, and a parse-failure
//! request that must come back as a 400.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use httpfromtcp::headers::Headers;
use httpfromtcp::request::Request;
use httpfromtcp::response::{StatusCode, Writer};
use httpfromtcp::server::{Handler, Server};

struct EchoTargetHandler;

#[async_trait]
impl Handler for EchoTargetHandler {
    async fn handle(&self, writer: &mut Writer<'_, TcpStream>, request: &Request) {
        match request.request_line.request_target.as_str() {
            "/chunked" => {
                writer.write_status_line(StatusCode::OK).await.unwrap();
                let mut headers = Headers::new();
                headers.set("Transfer-Encoding", "chunked");
                writer.write_headers(&headers).await.unwrap();
                writer.write_chunked_body(b"abcd").await.unwrap();
                writer.write_chunked_body(b"ef").await.unwrap();
                writer.write_chunked_body_done().await.unwrap();
                writer.write_trailers(&Headers::new()).await.unwrap();
            }
            target => {
                let body = target.as_bytes();
                writer.write_status_line(StatusCode::OK).await.unwrap();
                writer
                    .write_headers(&Headers::default_response_headers(body.len()))
                    .await
                    .unwrap();
                writer.write_body(body).await.unwrap();
            }
        }
    }
}

async fn start_server() -> Server {
    Server::serve("127.0.0.1:0", Arc::new(EchoTargetHandler))
        .await
        .expect("server binds")
}

async fn roundtrip(addr: std::net::SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut conn = TcpStream::connect(addr).await.unwrap();
    conn.write_all(request).await.unwrap();
    conn.shutdown().await.ok();

    let mut response = Vec::new();
    conn.read_to_end(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn echoes_request_target_in_body() {
    let server = start_server().await;
    let addr = server.local_addr();

    let response = roundtrip(addr, b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("content-length: 6"));
    assert!(text.ends_with("/hello"));

    server.close();
}

#[tokio::test]
async fn chunked_route_produces_well_formed_framing() {
    let server = start_server().await;
    let addr = server.local_addr();

    let response = roundtrip(addr, b"GET /chunked HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.contains("4\r\nabcd\r\n2\r\nef\r\n0\r\n\r\n"));

    server.close();
}

#[tokio::test]
async fn malformed_request_line_produces_400() {
    let server = start_server().await;
    let addr = server.local_addr();

    let response = roundtrip(addr, b"GET /\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    server.close();
}

#[tokio::test]
async fn unsupported_version_produces_400_with_message_as_body() {
    let server = start_server().await;
    let addr = server.local_addr();

    let response = roundtrip(addr, b"GET / HTTP/2.0\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(text.contains("unsupported http version"));

    server.close();
}
