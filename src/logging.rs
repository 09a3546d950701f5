use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder};

/// HTTP stack modules, silenced below Trace.
const FILTERED_MODULES: &[&str] = &["reqwest", "hyper", "hyper_util", "cookie_store", "mio"];

pub struct Logger {}

impl Logger {
    /// Installs a terminal logger at `config.log_level_filter`. Fails if a
    /// global logger is already set.
    pub fn init_logger(config: &Config) -> anyhow::Result<()> {
        let apply_filters = Self::should_filter_dependencies(config.log_level_filter);
        let log_config = Self::build_log_config(apply_filters);

        simplelog::TermLogger::init(
            config.log_level_filter,
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )?;
        Ok(())
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
