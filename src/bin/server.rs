use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;

use fakedis::builder;
use fakedis::commands::{Fakes, Handler};
use fakedis::server::Server;
use fakedis::Error;

const PORT: u16 = 6379;

#[derive(Parser, Debug)]
struct Args {
    /// The port to listen on
    #[arg(short, long, env = "FAKEDIS_PORT", default_value_t = PORT)]
    port: u16,

    /// Extra configuration answered by `CONFIG GET`, as name=value
    #[arg(short, long = "config", value_parser = parse_key_value)]
    config: Vec<(String, String)>,

    /// Values returned by GET and MGET, as key=value
    #[arg(short, long = "fixture", value_parser = parse_key_value)]
    fixtures: Vec<(String, String)>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", s))
}

/// Answers GET, MGET and DEL from a fixed set of values. EVAL has no scripts and replies nil.
struct Fixtures {
    values: HashMap<String, String>,
}

impl Fixtures {
    fn get(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(value) => builder::string(Some(value)),
            None => builder::nil(),
        }
    }
}

impl Handler for Fixtures {
    fn handle(&self, args: &[String]) -> String {
        let keys = &args[1..];

        match args[0].to_lowercase().as_str() {
            "get" => match keys.first() {
                Some(key) => self.get(key),
                None => builder::error("ERR wrong number of arguments for 'get' command"),
            },
            "mget" => builder::array(&keys.iter().map(|key| self.get(key)).collect::<Vec<_>>()),
            "del" => builder::int(keys.len() as i64),
            _ => builder::nil(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();

    let fakes = args
        .config
        .iter()
        .fold(Fakes::default(), |fakes, (name, value)| fakes.config(name, value));
    let fixtures = Fixtures {
        values: args.fixtures.into_iter().collect(),
    };

    let server = Server::builder()
        .handlers(&["GET", "MGET", "DEL", "EVAL"], Arc::new(fixtures))
        .fakes(fakes)
        .bind(("127.0.0.1", args.port))
        .await?;

    let stop = server.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    server.run().await
}
