use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if cfg!(test) {
        let _ = builder.compact().with_test_writer().try_init();
    } else {
        let _ = builder.try_init();
    }
}
