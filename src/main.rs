//! Signaling relay server
//!
//! Usage: signal-relay [BIND_ADDR]
//!
//! Examples:
//!   signal-relay                    # binds to 0.0.0.0:8081
//!   signal-relay localhost          # binds to 127.0.0.1:8081
//!   signal-relay :9000              # binds to 0.0.0.0:9000
//!   signal-relay 127.0.0.1:9000     # binds to 127.0.0.1:9000
//!
//! Connect with `ws://HOST:PORT/ws?id=alice&role=caller` and list connected
//! participants with `GET /list`. Set `RUST_LOG` to adjust logging.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use signal_relay::server::config::DEFAULT_PORT;
use signal_relay::{RelayServer, ServerConfig};

/// Parse bind address from command line argument
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8081
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:8081
/// - ":9000" -> 0.0.0.0:9000
/// - "0.0.0.0:9000" -> 0.0.0.0:9000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Some(port) = normalized.strip_prefix(':') {
        if let Ok(port) = port.parse::<u16>() {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
        }
    }

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT, :PORT, IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: signal-relay [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:{})", DEFAULT_PORT);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => ServerConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signal_relay=debug".parse()?),
        )
        .init();

    let server = RelayServer::new(config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(addr = %server.bind_addr(), error = %e, "Server error");
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_localhost() {
        assert_eq!(
            parse_bind_addr("localhost").unwrap(),
            "127.0.0.1:8081".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("localhost:9000").unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_parse_port_only() {
        assert_eq!(
            parse_bind_addr(":9000").unwrap(),
            "0.0.0.0:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_parse_ip_without_port() {
        let addr = parse_bind_addr("10.0.0.5").unwrap();
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_bind_addr("nope").is_err());
        assert!(parse_bind_addr(":notaport").is_err());
    }
}
