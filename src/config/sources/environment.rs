//! Environment source: `SYLLABUS__QUIZ__PASS_THRESHOLD=80` style overrides.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("SYLLABUS")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
