use std::path::PathBuf;

/// Initialise `env_logger` with the default stderr target.
pub fn init() {
    init_with(None);
}

/// Initialise `env_logger`, writing to `log_file` when it can be opened.
///
/// `RUST_LOG` still wins over the default `info` level. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_with(log_file: Option<PathBuf>) {
    use env_logger::Target;
    use std::fs;
    use std::io;

    let target = log_file
        .and_then(|path| {
            (|| -> io::Result<Target> {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)?;
                Ok(Target::Pipe(Box::new(file)))
            })()
            .ok()
        })
        .unwrap_or(Target::Stderr);

    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(target)
        .try_init();
}
