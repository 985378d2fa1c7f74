use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::config::LogConfig;

/// env_logger を初期化する
///
/// `RUST_LOG` があればそちらを優先。`to_file` のときは logs/ 以下に書き出し、パスを返す。
pub fn init(config: &LogConfig) -> Result<Option<PathBuf>> {
    let env = env_logger::Env::default().default_filter_or(config.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    let path = if config.to_file {
        let path = open_log_path()?;
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(BufWriter::new(file))));
        eprintln!("Log: {}", path.display());
        Some(path)
    } else {
        None
    };

    builder.try_init().context("Logger already initialized")?;
    Ok(path)
}

fn open_log_path() -> Result<PathBuf> {
    std::fs::create_dir_all("logs").context("Failed to create logs directory")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    Ok(PathBuf::from(format!("logs/fall_{}.log", ts)))
}
