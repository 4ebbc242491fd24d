use std::str::FromStr;

use log::LevelFilter;
use simplelog::SimpleLogger;

// Setup logging from the `LOG_LEVEL` environment
pub fn setup() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}
