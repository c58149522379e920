use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Transport the MCP server runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMode {
    /// MCP over stdin/stdout
    Stdio,
    /// MCP over streamable HTTP
    Http { addr: SocketAddr },
}

/// Nextcloud MCP server
#[derive(Parser, Debug)]
#[command(name = "nextcloud-mcp-server", version, about)]
pub struct Args {
    /// Start MCP server on stdin/stdout
    #[arg(long)]
    pub mcp_stdio: bool,

    /// Start MCP server on HTTP
    #[arg(long)]
    pub mcp_http: bool,

    /// Port for HTTP MCP server
    #[arg(long, env = "NEXTCLOUD_MCP_PORT", default_value = "8000")]
    pub port: u16,

    /// Address the HTTP MCP server binds to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Optional TOML file with NEXTCLOUD_* settings; the environment wins
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Exactly one transport must be selected
    pub fn validate(&self) -> Result<(), String> {
        match (self.mcp_stdio, self.mcp_http) {
            (true, true) => Err("--mcp-stdio and --mcp-http cannot be used together".into()),
            (false, false) => Err("must use either --mcp-stdio or --mcp-http".into()),
            _ => Ok(()),
        }
    }

    pub fn mode(&self) -> Result<ServerMode, String> {
        self.validate()?;
        if self.mcp_stdio {
            return Ok(ServerMode::Stdio);
        }
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| format!("invalid bind address {:?}: {e}", self.bind))?;
        Ok(ServerMode::Http {
            addr: SocketAddr::new(ip, self.port),
        })
    }
}
