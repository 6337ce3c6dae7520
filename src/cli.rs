use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "packpress")]
#[command(version)]
#[command(about = "Recompress Minecraft resource-pack textures over HTTP", long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Strip error details from 500 responses
    #[arg(long, env = "PACKPRESS_PRODUCTION")]
    pub production: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["packpress"]);
        assert_eq!(cli.bind, "0.0.0.0:3000".parse().unwrap());
        assert!(!cli.production);
    }

    #[test]
    fn custom_bind_and_production() {
        let cli = Cli::parse_from(["packpress", "--bind", "127.0.0.1:8080", "--production"]);
        assert_eq!(cli.bind, "127.0.0.1:8080".parse().unwrap());
        assert!(cli.production);
    }
}
