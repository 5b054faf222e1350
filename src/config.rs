// Application configuration, loaded from environment variables and CLI flags.

use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string. `None` keeps sessions in memory.
    pub database_url: Option<String>,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Pause between simulated bot darts, so observers can follow along.
    pub bot_throw_delay: Duration,
    /// Buffer size of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            port: 3000,
            bot_throw_delay: Duration::from_millis(800),
            event_channel_capacity: 256,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: in-memory store)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `BOT_THROW_DELAY_MS` - Pause between bot darts (default: 800)
    /// - `EVENT_CHANNEL_CAPACITY` - Event broadcast buffer (default: 256)
    ///
    /// CLI flags:
    /// - `--database <URL>` - Override the database URL
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        let database_url = Self::parse_cli_value(args, "--database")
            .or_else(|| env("DATABASE_URL"))
            .filter(|url| !url.is_empty());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let bot_throw_delay = env("BOT_THROW_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.bot_throw_delay);

        let event_channel_capacity = env("EVENT_CHANNEL_CAPACITY")
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.event_channel_capacity);

        Config {
            database_url,
            port,
            bot_throw_delay,
            event_channel_capacity,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}
