use clap::Parser;
use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Values used when the command line does not provide them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultConfig {
    pub port: u16,
}

pub fn get_default_config() -> DefaultConfig {
    DefaultConfig { port: 3000 }
}

/// Runs an API Gateway proxy function locally behind an HTTP server.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "local-api", version, about)]
pub struct Options {
    /// Path to the function executable, e.g. target/debug/my-api.
    /// It is started with AWS_LAMBDA_RUNTIME_API pointing at this server.
    #[arg(long = "api-module", value_name = "PATH")]
    pub api_module: PathBuf,

    /// Port for the HTTP server
    #[arg(long, default_value_t = get_default_config().port)]
    pub port: u16,

    /// Address of the Lambda Runtime API served to the function.
    /// 127.0.0.1:9001 is the default endpoint used on AWS.
    #[arg(long = "runtime-api", value_name = "ADDR", default_value = "127.0.0.1:9001")]
    pub runtime_api: SocketAddr,

    /// Function name exported as AWS_LAMBDA_FUNCTION_NAME
    #[arg(long = "function-name", value_name = "NAME", default_value = "local-api")]
    pub function_name: String,
}

impl Options {
    /// Parses an explicit argument list. The first item is the binary name.
    pub fn parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }
}
