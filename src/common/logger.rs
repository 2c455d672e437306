use env_logger::Builder;
use log::LevelFilter;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn initialize_logger() {
    INIT.call_once(|| {
        let mut builder = Builder::new();

        builder
            .filter_level(LevelFilter::Info)
            .filter_module("exthash", LevelFilter::Debug)
            .filter_module("exthash::buffer", LevelFilter::Debug)
            .filter_module("exthash::container", LevelFilter::Debug)
            .format_timestamp_millis()
            .parse_default_env()
            .is_test(true)
            .try_init()
            .ok();
    });
}
