use log::LevelFilter;

const NOISY_TARGETS: [&str; 4] = ["wgpu", "naga", "iced_wgpu", "cosmic_text"];

pub fn setup(is_debug: bool) -> Result<(), data::log::Error> {
    let level = if is_debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ));
        })
        .level(level)
        .level_for("panic", LevelFilter::Error);

    for target in NOISY_TARGETS {
        logger = logger.level_for(target, LevelFilter::Warn);
    }

    logger
        .chain(std::io::stdout())
        .chain(data::log::file()?)
        .apply()?;

    Ok(())
}

/// Routes panics through the logger so they end up in the log file too.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        log::error!(target: "panic", "{info}");
        default_hook(info);
    }));
}
